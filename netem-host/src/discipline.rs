//! The table of registered queuing disciplines.
//!
//! A qdisc can only be created on a device once its discipline has been registered, which is
//! what a module does first when it loads.

use netem_sched::QdiscKind;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::RegisterError;

/// Descriptor of a queuing discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QdiscOps {
    /// The discipline id, e.g. `"netem"`.
    pub id: &'static str,
    /// The kind of instance the discipline creates.
    pub kind: QdiscKind,
}

impl QdiscOps {
    /// The descriptor for a kind, named after its tc id.
    pub const fn for_kind(kind: QdiscKind) -> Self {
        Self { id: kind.id(), kind }
    }
}

/// Registered disciplines, keyed by id.
#[derive(Debug, Default)]
pub struct DisciplineTable {
    ops: RwLock<FxHashMap<&'static str, QdiscOps>>,
}

impl DisciplineTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a discipline. Fails if the id is taken.
    pub fn register(&self, ops: QdiscOps) -> Result<(), RegisterError> {
        let mut table = self.ops.write();
        if table.contains_key(ops.id) {
            return Err(RegisterError::Exists { what: "qdisc", name: ops.id.to_string() });
        }

        table.insert(ops.id, ops);
        debug!(id = ops.id, "registered qdisc");
        Ok(())
    }

    /// Unregister a discipline by id.
    pub fn unregister(&self, id: &str) -> Result<QdiscOps, RegisterError> {
        let ops = self
            .ops
            .write()
            .remove(id)
            .ok_or_else(|| RegisterError::NotRegistered { what: "qdisc", name: id.to_string() })?;

        debug!(id, "unregistered qdisc");
        Ok(ops)
    }

    /// Look up a discipline by id.
    pub fn lookup(&self, id: &str) -> Option<QdiscOps> {
        self.ops.read().get(id).copied()
    }

    /// Returns `true` if a discipline with this id is registered.
    pub fn is_registered(&self, id: &str) -> bool {
        self.ops.read().contains_key(id)
    }
}
