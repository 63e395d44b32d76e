use std::{fmt, str::FromStr, time::Instant};

use thiserror::Error;

use crate::{
    counters::QueueCounters,
    fifo::{PfifoQdisc, DEFAULT_PFIFO_LIMIT},
    handle::Handle,
    impairment::{ConfigError, LinkImpairment},
    netem::NetemQdisc,
    packet::{Packet, Verdict},
};

/// The kind of a qdisc instance. Fixed for the lifetime of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QdiscKind {
    /// Network emulator.
    Netem,
    /// Packet FIFO.
    Pfifo,
}

impl QdiscKind {
    /// The discipline id, as used by tc (`"netem"`, `"pfifo"`).
    pub const fn id(self) -> &'static str {
        match self {
            Self::Netem => "netem",
            Self::Pfifo => "pfifo",
        }
    }
}

impl fmt::Display for QdiscKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error returned for an unknown discipline id.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown qdisc kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for QdiscKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "netem" => Ok(Self::Netem),
            "pfifo" => Ok(Self::Pfifo),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Parameters for creating a qdisc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QdiscSpec {
    /// A netem qdisc with the given impairments.
    Netem(LinkImpairment),
    /// A pfifo qdisc with a packet limit.
    Pfifo {
        /// Maximum queued packets.
        limit: u32,
    },
}

impl QdiscSpec {
    /// A netem spec with no impairment.
    pub fn netem() -> Self {
        Self::Netem(LinkImpairment::default())
    }

    /// A pfifo spec with the default limit.
    pub const fn pfifo() -> Self {
        Self::Pfifo { limit: DEFAULT_PFIFO_LIMIT }
    }

    /// The kind of qdisc this spec builds.
    pub const fn kind(&self) -> QdiscKind {
        match self {
            Self::Netem(_) => QdiscKind::Netem,
            Self::Pfifo { .. } => QdiscKind::Pfifo,
        }
    }

    /// Build the qdisc.
    pub fn build(self, handle: Handle) -> Result<Qdisc, ConfigError> {
        Ok(match self {
            Self::Netem(config) => Qdisc::Netem(NetemQdisc::new(handle, config)?),
            Self::Pfifo { limit } => {
                if limit == 0 {
                    return Err(ConfigError::ZeroLimit);
                }
                Qdisc::Pfifo(PfifoQdisc::new(handle, limit))
            }
        })
    }
}

/// A live qdisc instance of any supported kind.
///
/// Kinds have unrelated internals; code that needs kind-specific state matches on the
/// variant.
#[derive(Debug)]
pub enum Qdisc {
    /// A netem instance.
    Netem(NetemQdisc),
    /// A pfifo instance.
    Pfifo(PfifoQdisc),
}

impl Qdisc {
    /// The instance kind.
    #[inline]
    pub const fn kind(&self) -> QdiscKind {
        match self {
            Self::Netem(_) => QdiscKind::Netem,
            Self::Pfifo(_) => QdiscKind::Pfifo,
        }
    }

    /// The instance handle.
    pub fn handle(&self) -> Handle {
        match self {
            Self::Netem(q) => q.handle(),
            Self::Pfifo(q) => q.handle(),
        }
    }

    /// Offer a packet arriving at `now`.
    pub fn enqueue(&self, packet: Packet, now: Instant) -> Verdict {
        match self {
            Self::Netem(q) => q.enqueue(packet, now),
            Self::Pfifo(q) => q.enqueue(packet),
        }
    }

    /// Take the next packet ready at `now`.
    pub fn dequeue(&self, now: Instant) -> Option<Packet> {
        match self {
            Self::Netem(q) => q.dequeue(now),
            Self::Pfifo(q) => q.dequeue(),
        }
    }

    /// Drop every queued packet.
    pub fn reset(&self) {
        match self {
            Self::Netem(q) => q.reset(),
            Self::Pfifo(q) => q.reset(),
        }
    }

    /// Queue length and backlog.
    pub fn counters(&self) -> QueueCounters {
        match self {
            Self::Netem(q) => q.counters(),
            Self::Pfifo(q) => q.counters(),
        }
    }

    /// The netem instance, if this is one.
    pub const fn as_netem(&self) -> Option<&NetemQdisc> {
        match self {
            Self::Netem(q) => Some(q),
            _ => None,
        }
    }
}
