use netem_sched::{
    handle::ParseHandleError, impairment::ConfigError, netem::qopt::QoptError, Handle, QdiscKind,
};
use nix::errno::Errno;
use thiserror::Error;

use crate::registry::IfIndex;

/// Errors from publishing or withdrawing disciplines and capabilities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    /// Something with the same name is already registered.
    #[error("{what} {name:?} is already registered")]
    Exists {
        /// What was being registered.
        what: &'static str,
        /// The clashing name.
        name: String,
    },
    /// Nothing with this name is registered.
    #[error("{what} {name:?} is not registered")]
    NotRegistered {
        /// What was being looked up.
        what: &'static str,
        /// The missing name.
        name: String,
    },
}

impl RegisterError {
    /// The negative errno reported to a loader.
    pub const fn errno(&self) -> i32 {
        match self {
            Self::Exists { .. } => -(Errno::EEXIST as i32),
            Self::NotRegistered { .. } => -(Errno::ENOENT as i32),
        }
    }
}

/// Errors from the device and qdisc registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No device with this index.
    #[error("no device with ifindex {0}")]
    NoDevice(IfIndex),
    /// A device with this name already exists.
    #[error("device {0:?} already exists")]
    DeviceExists(String),
    /// No qdisc with this handle on the device.
    #[error("no qdisc {handle} on ifindex {ifindex}")]
    NoQdisc {
        /// The device.
        ifindex: IfIndex,
        /// The missing handle.
        handle: Handle,
    },
    /// The handle is already in use on the device.
    #[error("qdisc handle {handle} already in use on ifindex {ifindex}")]
    HandleExists {
        /// The device.
        ifindex: IfIndex,
        /// The clashing handle.
        handle: Handle,
    },
    /// The handle cannot be assigned to a qdisc.
    #[error("invalid qdisc handle {0}")]
    InvalidHandle(Handle),
    /// The requested discipline has not been registered.
    #[error("qdisc kind {0} is not registered")]
    UnknownDiscipline(QdiscKind),
    /// The operation does not apply to this kind of qdisc.
    #[error("qdisc {handle} is {kind}, operation not supported")]
    WrongKind {
        /// The qdisc.
        handle: Handle,
        /// Its kind.
        kind: QdiscKind,
    },
    /// Bad qdisc configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// Bad kernel-format options.
    #[error("invalid options: {0}")]
    Qopt(#[from] QoptError),
    /// Bad handle string.
    #[error(transparent)]
    ParseHandle(#[from] ParseHandleError),
}

impl RegistryError {
    /// The negative errno tc would report for this error.
    pub const fn errno(&self) -> i32 {
        let errno = match self {
            Self::NoDevice(_) => Errno::ENODEV,
            Self::DeviceExists(_) | Self::HandleExists { .. } => Errno::EEXIST,
            Self::NoQdisc { .. } | Self::UnknownDiscipline(_) => Errno::ENOENT,
            Self::WrongKind { .. } => Errno::EOPNOTSUPP,
            Self::InvalidHandle(_) | Self::Config(_) | Self::Qopt(_) | Self::ParseHandle(_) => {
                Errno::EINVAL
            }
        };
        -(errno as i32)
    }
}
