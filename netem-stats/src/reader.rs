//! The statistics snapshot reader.
//!
//! Extension programs pass in a handle they obtained out of band, so every handle is
//! untrusted: it may name nothing, a deleted qdisc, or a qdisc of another kind. Those are
//! ordinary outcomes, reported as [`StatsError`] and never logged.

use std::{fmt, sync::Arc};

use netem_host::{InstanceRegistry, PacketContext};
use netem_sched::{Handle, Qdisc, QdiscKind};
use nix::errno::Errno;
use thiserror::Error;

use crate::snapshot::Snapshot;

/// Why a snapshot could not be taken.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StatsError {
    /// No live qdisc has this handle on the packet's interface.
    #[error("no qdisc with handle {0}")]
    NotFound(Handle),
    /// The handle names a qdisc that is not netem.
    #[error("qdisc {handle} is {kind}, not netem")]
    UnsupportedKind {
        /// The handle looked up.
        handle: Handle,
        /// The kind found.
        kind: QdiscKind,
    },
}

impl StatsError {
    /// The negative errno returned to extension programs.
    pub const fn errno(&self) -> i32 {
        match self {
            Self::NotFound(_) => -(Errno::ENOENT as i32),
            Self::UnsupportedKind { .. } => -(Errno::EOPNOTSUPP as i32),
        }
    }
}

/// Reads netem queue statistics on behalf of extension programs.
///
/// Runs inline on the packet path: one lock-free registry lookup and one atomic load, no
/// locks shared with enqueue or dequeue.
#[derive(Clone)]
pub struct NetemStatsReader {
    registry: Arc<dyn InstanceRegistry>,
}

impl fmt::Debug for NetemStatsReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetemStatsReader").finish_non_exhaustive()
    }
}

impl NetemStatsReader {
    /// Create a reader resolving handles through `registry`.
    pub fn new(registry: Arc<dyn InstanceRegistry>) -> Self {
        Self { registry }
    }

    /// Snapshot the netem qdisc `handle` on the packet's interface into `out`.
    ///
    /// On error `out` is left exactly as it was.
    pub fn read_stats(
        &self,
        ctx: &PacketContext,
        handle: u32,
        out: &mut Snapshot,
    ) -> Result<(), StatsError> {
        let handle = Handle::from_raw(handle);
        let qdisc = self
            .registry
            .lookup_instance(ctx.ifindex(), handle)
            .ok_or(StatsError::NotFound(handle))?;

        *out = netem_snapshot(&qdisc, handle)?;
        Ok(())
    }

    /// [`Self::read_stats`] with the calling convention programs use: `0` on success, a
    /// negative errno otherwise. A null `out` yields `-EINVAL`.
    ///
    /// # Safety
    ///
    /// `out` must be null or valid for writes of [`Snapshot::SIZE`] bytes. It need not be
    /// aligned or initialized. Nothing is written on failure.
    pub unsafe fn read_stats_raw(&self, ctx: &PacketContext, handle: u32, out: *mut Snapshot) -> i32 {
        if out.is_null() {
            return -(Errno::EINVAL as i32);
        }

        let mut snapshot = Snapshot::default();
        match self.read_stats(ctx, handle, &mut snapshot) {
            Ok(()) => {
                // SAFETY: non-null and valid for writes per the caller contract.
                unsafe { out.write_unaligned(snapshot) };
                0
            }
            Err(e) => e.errno(),
        }
    }
}

/// Copy the counters out of a netem instance. Other kinds have unrelated internals and are
/// rejected before any of their state is touched.
#[inline]
fn netem_snapshot(qdisc: &Qdisc, handle: Handle) -> Result<Snapshot, StatsError> {
    match qdisc {
        Qdisc::Netem(netem) => Ok(Snapshot::from(netem.counters())),
        other => Err(StatsError::UnsupportedKind { handle, kind: other.kind() }),
    }
}
