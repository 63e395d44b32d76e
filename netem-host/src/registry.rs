//! Devices and the qdiscs attached to them.
//!
//! Both the device table and each device's qdisc table are copy-on-write maps behind an
//! [`ArcSwap`]. Readers take a lock-free snapshot and are never blocked by, nor block, a
//! concurrent create or delete. Writers serialize on one mutex, build a new map and publish
//! it; a reader holding the old snapshot keeps every `Arc<Qdisc>` it handed out alive, so an
//! instance is never freed under a reader even if its handle is deleted and reused.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use arc_swap::ArcSwap;
use netem_sched::{netem::qopt::NetemQopt, Handle, LinkImpairment, Qdisc, QdiscSpec};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{discipline::DisciplineTable, error::RegistryError};

/// Network interface index.
pub type IfIndex = u32;

type QdiscMap = FxHashMap<Handle, Arc<Qdisc>>;

/// Lookup of live qdisc instances by handle.
///
/// Implementations must be safe to call from any number of threads while instances are
/// being created and destroyed, and must not block.
pub trait InstanceRegistry: Send + Sync + 'static {
    /// Find the live instance with `handle` on the interface `ifindex`.
    fn lookup_instance(&self, ifindex: IfIndex, handle: Handle) -> Option<Arc<Qdisc>>;
}

/// A network device and its qdiscs.
#[derive(Debug)]
pub struct NetDevice {
    ifindex: IfIndex,
    name: String,
    qdiscs: ArcSwap<QdiscMap>,
}

impl NetDevice {
    /// The interface index.
    pub fn ifindex(&self) -> IfIndex {
        self.ifindex
    }

    /// The interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lock-free lookup of a qdisc on this device.
    pub fn qdisc(&self, handle: Handle) -> Option<Arc<Qdisc>> {
        self.qdiscs.load().get(&handle).cloned()
    }

    /// Handles of all qdiscs on this device, sorted.
    pub fn handles(&self) -> Vec<Handle> {
        let mut handles: Vec<_> = self.qdiscs.load().keys().copied().collect();
        handles.sort_unstable();
        handles
    }
}

/// The device and qdisc registry.
#[derive(Debug)]
pub struct Registry {
    disciplines: Arc<DisciplineTable>,
    devices: ArcSwap<FxHashMap<IfIndex, Arc<NetDevice>>>,
    next_ifindex: AtomicU32,
    /// Serializes writers of both table levels.
    write_lock: Mutex<()>,
}

impl Registry {
    /// Create an empty registry. Qdisc creation is checked against `disciplines`.
    pub fn new(disciplines: Arc<DisciplineTable>) -> Self {
        Self {
            disciplines,
            devices: ArcSwap::from_pointee(FxHashMap::default()),
            next_ifindex: AtomicU32::new(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Add a device, returning its interface index.
    pub fn add_device(&self, name: impl Into<String>) -> Result<IfIndex, RegistryError> {
        let name = name.into();
        let _guard = self.write_lock.lock();

        let current = self.devices.load();
        if current.values().any(|dev| dev.name == name) {
            return Err(RegistryError::DeviceExists(name));
        }

        let ifindex = self.next_ifindex.fetch_add(1, Ordering::Relaxed);
        let device = NetDevice {
            ifindex,
            name: name.clone(),
            qdiscs: ArcSwap::from_pointee(QdiscMap::default()),
        };

        let mut devices = (**current).clone();
        devices.insert(ifindex, Arc::new(device));
        self.devices.store(Arc::new(devices));

        debug!(ifindex, %name, "added device");
        Ok(ifindex)
    }

    /// Remove a device and all its qdiscs.
    pub fn remove_device(&self, ifindex: IfIndex) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock();

        let mut devices = (**self.devices.load()).clone();
        let device = devices.remove(&ifindex).ok_or(RegistryError::NoDevice(ifindex))?;
        self.devices.store(Arc::new(devices));

        for qdisc in device.qdiscs.load().values() {
            qdisc.reset();
        }

        debug!(ifindex, name = %device.name, "removed device");
        Ok(())
    }

    /// Lock-free lookup of a device.
    pub fn device(&self, ifindex: IfIndex) -> Option<Arc<NetDevice>> {
        self.devices.load().get(&ifindex).cloned()
    }

    /// Find a device by name.
    pub fn device_by_name(&self, name: &str) -> Option<Arc<NetDevice>> {
        self.devices.load().values().find(|dev| dev.name == name).cloned()
    }

    /// Create a qdisc on a device.
    ///
    /// The discipline must be registered and the handle free on that device.
    pub fn create_qdisc(
        &self,
        ifindex: IfIndex,
        handle: Handle,
        spec: QdiscSpec,
    ) -> Result<Arc<Qdisc>, RegistryError> {
        if handle.is_unspec() || handle == Handle::ROOT || handle.minor() != 0 {
            return Err(RegistryError::InvalidHandle(handle));
        }

        let kind = spec.kind();
        match self.disciplines.lookup(kind.id()) {
            Some(ops) if ops.kind == kind => {}
            _ => return Err(RegistryError::UnknownDiscipline(kind)),
        }

        let _guard = self.write_lock.lock();
        let device = self.device(ifindex).ok_or(RegistryError::NoDevice(ifindex))?;

        let current = device.qdiscs.load();
        if current.contains_key(&handle) {
            return Err(RegistryError::HandleExists { ifindex, handle });
        }

        let qdisc = Arc::new(spec.build(handle)?);
        let mut qdiscs = (**current).clone();
        qdiscs.insert(handle, Arc::clone(&qdisc));
        device.qdiscs.store(Arc::new(qdiscs));

        debug!(ifindex, %handle, %kind, "created qdisc");
        Ok(qdisc)
    }

    /// Delete a qdisc from a device and drop its queued packets.
    ///
    /// Readers that already resolved the handle keep a valid instance; later lookups of the
    /// handle fail, or find whatever instance reuses it.
    pub fn delete_qdisc(
        &self,
        ifindex: IfIndex,
        handle: Handle,
    ) -> Result<Arc<Qdisc>, RegistryError> {
        let _guard = self.write_lock.lock();
        let device = self.device(ifindex).ok_or(RegistryError::NoDevice(ifindex))?;

        let mut qdiscs = (**device.qdiscs.load()).clone();
        let qdisc = qdiscs.remove(&handle).ok_or(RegistryError::NoQdisc { ifindex, handle })?;
        device.qdiscs.store(Arc::new(qdiscs));
        qdisc.reset();

        debug!(ifindex, %handle, kind = %qdisc.kind(), "deleted qdisc");
        Ok(qdisc)
    }

    /// Change the impairments of a netem qdisc.
    pub fn change_netem(
        &self,
        ifindex: IfIndex,
        handle: Handle,
        config: LinkImpairment,
    ) -> Result<(), RegistryError> {
        let qdisc = self.qdisc(ifindex, handle)?;
        let Some(netem) = qdisc.as_netem() else {
            return Err(RegistryError::WrongKind { handle, kind: qdisc.kind() });
        };

        netem.change(config)?;
        Ok(())
    }

    /// Change a netem qdisc from kernel-format `tc_netem_qopt` options.
    ///
    /// Fields the structure does not carry (reorder probability, seed) keep their current
    /// values.
    pub fn change_netem_raw(
        &self,
        ifindex: IfIndex,
        handle: Handle,
        options: &[u8],
    ) -> Result<(), RegistryError> {
        let qopt = NetemQopt::try_from(options)?;
        let qdisc = self.qdisc(ifindex, handle)?;
        let Some(netem) = qdisc.as_netem() else {
            return Err(RegistryError::WrongKind { handle, kind: qdisc.kind() });
        };

        let current = netem.config();
        let config =
            LinkImpairment { reorder: current.reorder, seed: current.seed, ..qopt.to_impairment() };
        netem.change(config)?;
        Ok(())
    }

    /// Look up a qdisc, reporting why it could not be found.
    pub fn qdisc(&self, ifindex: IfIndex, handle: Handle) -> Result<Arc<Qdisc>, RegistryError> {
        let device = self.device(ifindex).ok_or(RegistryError::NoDevice(ifindex))?;
        device.qdisc(handle).ok_or(RegistryError::NoQdisc { ifindex, handle })
    }

    /// Handles of all qdiscs on a device.
    pub fn handles(&self, ifindex: IfIndex) -> Result<Vec<Handle>, RegistryError> {
        Ok(self.device(ifindex).ok_or(RegistryError::NoDevice(ifindex))?.handles())
    }
}

impl InstanceRegistry for Registry {
    #[inline]
    fn lookup_instance(&self, ifindex: IfIndex, handle: Handle) -> Option<Arc<Qdisc>> {
        let devices = self.devices.load();
        devices.get(&ifindex)?.qdisc(handle)
    }
}
