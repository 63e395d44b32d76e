#![doc(issue_tracker_base_url = "https://github.com/chainbound/netem-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Host-side collaborators for netem-rs.
//!
//! - [`registry::Registry`]: devices and their qdiscs, with lock-free lookup by handle
//! - [`discipline::DisciplineTable`]: the queuing disciplines that may be instantiated
//! - [`ext::CapabilityRegistry`]: functions published to extension programs
//! - [`Host`]: the three of them together, as modules see them when they load

/// The context extension programs run with.
pub mod context;
pub mod discipline;
/// Registry and registration errors.
pub mod error;
pub mod ext;
mod host;
pub mod registry;

pub use context::PacketContext;
pub use discipline::{DisciplineTable, QdiscOps};
pub use error::{RegisterError, RegistryError};
pub use host::Host;
pub use registry::{IfIndex, InstanceRegistry, NetDevice, Registry};
