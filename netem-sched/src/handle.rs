//! Qdisc handles.
//!
//! Handles are 32-bit values split into major:minor (16:16 bits), following the tc
//! convention. A handle is only unique among the live qdiscs of one interface, and may be
//! handed out again once the qdisc that owned it is gone.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// An opaque qdisc handle, `major:minor`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    /// The root pseudo-handle (`ffff:ffff`).
    pub const ROOT: Self = Self(0xFFFF_FFFF);

    /// The unspecified handle (`0:0`). Never assigned to a live qdisc.
    pub const UNSPEC: Self = Self(0);

    /// Build a handle from its major and minor halves.
    pub const fn new(major: u16, minor: u16) -> Self {
        Self(((major as u32) << 16) | minor as u32)
    }

    /// Wrap a raw 32-bit handle value, e.g. one supplied by an extension program.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw 32-bit value.
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// The upper 16 bits.
    pub const fn major(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// The lower 16 bits.
    pub const fn minor(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Returns `true` for [`Handle::UNSPEC`].
    pub const fn is_unspec(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Handle {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<Handle> for u32 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl fmt::Display for Handle {
    /// Formats as tc does: hexadecimal `major:minor`, with `root` for [`Handle::ROOT`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ROOT {
            return f.write_str("root");
        }
        write!(f, "{:x}:{:x}", self.major(), self.minor())
    }
}

/// Error returned when parsing a [`Handle`] from a string fails.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid qdisc handle: {0:?}")]
pub struct ParseHandleError(String);

impl FromStr for Handle {
    type Err = ParseHandleError;

    /// Parses `root`, `major:` or `major:minor`, where both halves are hexadecimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "root" {
            return Ok(Self::ROOT);
        }

        let err = || ParseHandleError(s.to_string());
        let (major, minor) = s.split_once(':').ok_or_else(err)?;
        let major = u16::from_str_radix(major, 16).map_err(|_| err())?;
        let minor = if minor.is_empty() {
            0
        } else {
            u16::from_str_radix(minor, 16).map_err(|_| err())?
        };

        Ok(Self::new(major, minor))
    }
}
