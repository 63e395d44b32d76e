//! Extension-program capabilities.
//!
//! Modules publish small sets of callable functions ("capabilities") to a single category of
//! sandboxed extension programs. A program can only resolve the capabilities published for
//! its own [`ProgramType`]. Every capability carries a [`Signature`] describing its
//! arguments, which is what the loader checks a call site against before the program runs.
//!
//! Arguments cross the boundary as [`Arg`] values: scalars, or writable memory regions that
//! the program owns. A capability never keeps a reference to an argument past the call.

use std::{fmt, sync::Arc};

mod registry;

pub use registry::CapabilityRegistry;

use crate::context::PacketContext;

/// Categories of extension programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramType {
    /// Traffic-control classifiers, run from the packet-scheduling path.
    SchedCls,
    /// Traffic-control actions.
    SchedAct,
    /// Programs run at the driver receive hook.
    Xdp,
    /// Socket filters.
    SocketFilter,
    /// Tracing programs.
    Tracing,
}

impl fmt::Display for ProgramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SchedCls => "sched_cls",
            Self::SchedAct => "sched_act",
            Self::Xdp => "xdp",
            Self::SocketFilter => "socket_filter",
            Self::Tracing => "tracing",
        })
    }
}

/// Type of a capability parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// An integer, passed by value.
    Scalar,
    /// Program-owned memory of at least `size` bytes that the capability may write.
    MemOut {
        /// Minimum region size in bytes.
        size: usize,
    },
}

/// Type description of a capability. Capabilities always return an `i32` status: `0` or a
/// positive value on success, a negative errno on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Whether the packet context is passed implicitly.
    pub context: bool,
    /// Explicit parameters, in order.
    pub params: &'static [ParamType],
}

impl Signature {
    /// Returns `true` if `args` fit this signature.
    pub fn accepts(&self, args: &[Arg<'_>]) -> bool {
        args.len() == self.params.len()
            && self.params.iter().zip(args).all(|(param, arg)| match (param, arg) {
                (ParamType::Scalar, Arg::Scalar(_)) => true,
                (ParamType::MemOut { size }, Arg::Mem(mem)) => mem.len() >= *size,
                _ => false,
            })
    }
}

/// An argument passed by an extension program.
#[derive(Debug)]
pub enum Arg<'a> {
    /// A scalar value.
    Scalar(u64),
    /// A writable memory region owned by the program.
    Mem(&'a mut [u8]),
}

/// A function published to extension programs.
pub trait Capability: fmt::Debug + Send + Sync + 'static {
    /// The name programs resolve the capability by.
    fn name(&self) -> &'static str;

    /// The type description of the capability.
    fn signature(&self) -> Signature;

    /// Run the capability. `args` have already been checked against [`Self::signature`].
    fn call(&self, ctx: &PacketContext, args: &mut [Arg<'_>]) -> i32;
}

/// A named group of capabilities published together by one owner.
#[derive(Debug, Clone)]
pub struct CapabilitySet {
    owner: &'static str,
    capabilities: Vec<Arc<dyn Capability>>,
}

impl CapabilitySet {
    /// An empty set owned by `owner` (usually the module name).
    pub fn new(owner: &'static str) -> Self {
        Self { owner, capabilities: Vec::new() }
    }

    /// Add a capability.
    pub fn with(mut self, capability: impl Capability) -> Self {
        self.capabilities.push(Arc::new(capability));
        self
    }

    /// The owner of the set.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Names of the capabilities in the set.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.capabilities.iter().map(|cap| cap.name())
    }

    pub(crate) fn into_capabilities(self) -> Vec<Arc<dyn Capability>> {
        self.capabilities
    }
}
