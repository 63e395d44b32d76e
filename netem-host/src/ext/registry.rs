use std::sync::Arc;

use nix::errno::Errno;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{Arg, Capability, CapabilitySet, ProgramType};
use crate::{context::PacketContext, error::RegisterError};

#[derive(Debug)]
struct Entry {
    owner: &'static str,
    capability: Arc<dyn Capability>,
}

/// Capabilities published per program type.
///
/// Publishing and withdrawing happen at module load and unload; resolution happens when a
/// program is loaded. Neither is on the packet path.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    by_type: RwLock<FxHashMap<ProgramType, FxHashMap<&'static str, Entry>>>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish every capability in `set` to programs of type `prog_type`.
    ///
    /// Either the whole set is published or, if any name is already taken for that program
    /// type (or repeated within the set), nothing is.
    pub fn register(&self, prog_type: ProgramType, set: CapabilitySet) -> Result<(), RegisterError> {
        let owner = set.owner();
        let mut by_type = self.by_type.write();
        let table = by_type.entry(prog_type).or_default();

        let mut seen = FxHashSet::default();
        for name in set.names() {
            if table.contains_key(name) || !seen.insert(name) {
                return Err(RegisterError::Exists { what: "capability", name: name.to_string() });
            }
        }

        for capability in set.into_capabilities() {
            let name = capability.name();
            table.insert(name, Entry { owner, capability });
            debug!(%prog_type, owner, name, "published capability");
        }

        Ok(())
    }

    /// Withdraw everything `owner` published for `prog_type`.
    pub fn unregister(&self, prog_type: ProgramType, owner: &str) -> Result<(), RegisterError> {
        let mut by_type = self.by_type.write();
        let table = by_type.entry(prog_type).or_default();

        let before = table.len();
        table.retain(|_, entry| entry.owner != owner);
        if table.len() == before {
            return Err(RegisterError::NotRegistered {
                what: "capability set",
                name: owner.to_string(),
            });
        }

        debug!(%prog_type, owner, removed = before - table.len(), "withdrew capabilities");
        Ok(())
    }

    /// Resolve a capability for a program of type `prog_type`.
    pub fn resolve(&self, prog_type: ProgramType, name: &str) -> Option<Arc<dyn Capability>> {
        let by_type = self.by_type.read();
        by_type.get(&prog_type)?.get(name).map(|entry| Arc::clone(&entry.capability))
    }

    /// Names published for `prog_type`, sorted.
    pub fn names(&self, prog_type: ProgramType) -> Vec<&'static str> {
        let by_type = self.by_type.read();
        let mut names: Vec<_> =
            by_type.get(&prog_type).map(|table| table.keys().copied().collect()).unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Resolve and call a capability the way a loaded program would.
    ///
    /// Returns `-ENOENT` if `name` is not available to `prog_type` and `-EINVAL` if `args`
    /// do not fit its signature; otherwise the capability's own result.
    pub fn invoke(
        &self,
        prog_type: ProgramType,
        name: &str,
        ctx: &PacketContext,
        args: &mut [Arg<'_>],
    ) -> i32 {
        let Some(capability) = self.resolve(prog_type, name) else {
            return -(Errno::ENOENT as i32);
        };

        if !capability.signature().accepts(args) {
            return -(Errno::EINVAL as i32);
        }

        capability.call(ctx, args)
    }
}
