use std::sync::Arc;

use crate::{discipline::DisciplineTable, ext::CapabilityRegistry, registry::Registry};

/// The host environment modules load into: the discipline table, the capability registry
/// for extension programs, and the device and qdisc registry.
#[derive(Debug, Clone)]
pub struct Host {
    disciplines: Arc<DisciplineTable>,
    capabilities: Arc<CapabilityRegistry>,
    registry: Arc<Registry>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// Create an empty host with no devices, disciplines or capabilities.
    pub fn new() -> Self {
        let disciplines = Arc::new(DisciplineTable::new());
        let registry = Arc::new(Registry::new(Arc::clone(&disciplines)));
        Self { disciplines, capabilities: Arc::new(CapabilityRegistry::new()), registry }
    }

    /// Registered queuing disciplines.
    pub fn disciplines(&self) -> &Arc<DisciplineTable> {
        &self.disciplines
    }

    /// Capabilities published to extension programs.
    pub fn capabilities(&self) -> &Arc<CapabilityRegistry> {
        &self.capabilities
    }

    /// Devices and their qdiscs.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}
