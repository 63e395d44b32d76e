#![doc(issue_tracker_base_url = "https://github.com/chainbound/netem-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Queuing disciplines for netem-rs.
//!
//! [`netem::NetemQdisc`] emulates a degraded link (delay, jitter, loss, duplication and
//! reordering); [`fifo::PfifoQdisc`] is a plain FIFO. Both are wrapped in the [`Qdisc`]
//! tagged union, which is what registries store.

/// Queue length and backlog, published for lock-free readers.
pub mod counters;
/// The pfifo discipline.
pub mod fifo;
pub mod handle;
pub mod impairment;
pub mod netem;
/// Packets and enqueue verdicts.
pub mod packet;
pub mod psched;
/// Qdisc kinds and the tagged union over them.
pub mod qdisc;

pub use counters::QueueCounters;
pub use handle::Handle;
pub use impairment::{ConfigError, LinkImpairment};
pub use netem::{NetemQdisc, NetemStats};
pub use packet::{Packet, Verdict};
pub use qdisc::{Qdisc, QdiscKind, QdiscSpec};
