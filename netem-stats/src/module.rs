//! Module lifecycle: publishing the netem discipline and its statistics capability.
//!
//! Loading is all-or-nothing. Each completed step pushes its undo onto a [`Registration`];
//! if a later step fails the registration is dropped uncommitted and the undos run in
//! reverse order. A committed registration becomes the module's [`Teardown`], which runs the
//! same undos, again in reverse, when the module is unloaded.

use std::{fmt, sync::Arc};

use netem_host::{
    ext::{CapabilitySet, ProgramType},
    Host, InstanceRegistry, QdiscOps, RegisterError,
};
use netem_sched::QdiscKind;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{capability::ReadStatsCapability, reader::NetemStatsReader};

/// Owner name for everything the module publishes.
pub const MODULE_NAME: &str = "sch_netem";

/// The only program type the statistics capability is published to: classifiers running in
/// the packet-scheduling path.
pub const STATS_PROGRAM_TYPE: ProgramType = ProgramType::SchedCls;

/// Module load failure. Nothing the module registered is left behind.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitError {
    /// Registering the netem discipline failed.
    #[error("failed to register qdisc: {0}")]
    Qdisc(#[source] RegisterError),
    /// Publishing the statistics capability failed.
    #[error("failed to register capability: {0}")]
    Capability(#[source] RegisterError),
}

impl InitError {
    /// The negative errno reported to the loader.
    pub const fn errno(&self) -> i32 {
        match self {
            Self::Qdisc(e) | Self::Capability(e) => e.errno(),
        }
    }
}

type Undo = Box<dyn FnOnce() + Send + Sync>;

/// Undo a list of steps, last first.
fn unwind(steps: &mut Vec<(&'static str, Undo)>, reason: &'static str) {
    while let Some((step, undo)) = steps.pop() {
        debug!(step, reason, "undoing registration step");
        undo();
    }
}

/// An in-progress, all-or-nothing sequence of registrations.
#[derive(Default)]
pub struct Registration {
    steps: Vec<(&'static str, Undo)>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<_> = self.steps.iter().map(|(step, _)| *step).collect();
        f.debug_struct("Registration").field("steps", &steps).finish()
    }
}

impl Registration {
    /// Start an empty registration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `register`; if it succeeds, remember `undo` for rollback and teardown.
    pub fn step<E>(
        &mut self,
        step: &'static str,
        register: impl FnOnce() -> Result<(), E>,
        undo: impl FnOnce() + Send + Sync + 'static,
    ) -> Result<(), E> {
        register()?;
        self.steps.push((step, Box::new(undo)));
        Ok(())
    }

    /// Names of the completed steps, in order.
    pub fn steps(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|(step, _)| *step)
    }

    /// Keep every step. The returned [`Teardown`] undoes them when run or dropped.
    pub fn commit(mut self) -> Teardown {
        Teardown { steps: std::mem::take(&mut self.steps) }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if !self.steps.is_empty() {
            warn!(steps = self.steps.len(), "rolling back incomplete registration");
        }
        unwind(&mut self.steps, "rollback");
    }
}

/// The undo steps of a committed [`Registration`].
pub struct Teardown {
    steps: Vec<(&'static str, Undo)>,
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown").field("steps", &self.steps.len()).finish()
    }
}

impl Teardown {
    /// Undo every step now.
    pub fn run(mut self) {
        unwind(&mut self.steps, "teardown");
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        unwind(&mut self.steps, "teardown");
    }
}

/// Register the netem discipline with the host.
pub fn register_qdisc(registration: &mut Registration, host: &Host) -> Result<(), InitError> {
    let disciplines = Arc::clone(host.disciplines());
    let undo = Arc::clone(&disciplines);

    registration
        .step(
            "qdisc",
            || disciplines.register(QdiscOps::for_kind(QdiscKind::Netem)),
            move || {
                if let Err(e) = undo.unregister(QdiscKind::Netem.id()) {
                    warn!(?e, "netem qdisc already unregistered");
                }
            },
        )
        .map_err(InitError::Qdisc)
}

/// Publish `netem_read_stats` to [`STATS_PROGRAM_TYPE`] programs.
pub fn register_capability(registration: &mut Registration, host: &Host) -> Result<(), InitError> {
    let registry: Arc<dyn InstanceRegistry> = Arc::clone(host.registry()) as _;
    let set = CapabilitySet::new(MODULE_NAME)
        .with(ReadStatsCapability::new(NetemStatsReader::new(registry)));

    let capabilities = Arc::clone(host.capabilities());
    let undo = Arc::clone(&capabilities);

    registration
        .step(
            "capability",
            || capabilities.register(STATS_PROGRAM_TYPE, set),
            move || {
                if let Err(e) = undo.unregister(STATS_PROGRAM_TYPE, MODULE_NAME) {
                    warn!(?e, "netem capabilities already withdrawn");
                }
            },
        )
        .map_err(InitError::Capability)
}

/// A loaded netem module.
///
/// Dropping it, or calling [`NetemModule::exit`], withdraws the capability and unregisters
/// the discipline.
#[derive(Debug)]
pub struct NetemModule {
    reader: NetemStatsReader,
    teardown: Option<Teardown>,
}

impl NetemModule {
    /// Load the module: register the discipline, then publish the statistics capability.
    pub fn init(host: &Host) -> Result<Self, InitError> {
        let mut registration = Registration::new();

        if let Err(e) = register_qdisc(&mut registration, host)
            .and_then(|()| register_capability(&mut registration, host))
        {
            error!(%e, errno = e.errno(), "netem module failed to load");
            return Err(e);
        }

        info!(program_type = %STATS_PROGRAM_TYPE, "netem module loaded");

        let registry: Arc<dyn InstanceRegistry> = Arc::clone(host.registry()) as _;
        Ok(Self { reader: NetemStatsReader::new(registry), teardown: Some(registration.commit()) })
    }

    /// A reader for in-process callers that want the same statistics programs see.
    pub fn reader(&self) -> &NetemStatsReader {
        &self.reader
    }

    /// Unload the module.
    pub fn exit(mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown.run();
        }
        info!("netem module unloaded");
    }
}

impl Drop for NetemModule {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown.run();
            info!("netem module unloaded");
        }
    }
}
