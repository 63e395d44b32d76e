#![doc(issue_tracker_base_url = "https://github.com/chainbound/netem-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Read-only netem queue statistics for extension programs.
//!
//! A packet-scheduling program calls `netem_read_stats(ctx, handle, &mut snapshot)` to learn
//! how many packets and bytes a netem qdisc on the packet's interface is holding, without
//! taking any lock the qdisc's own enqueue and dequeue paths take.
//!
//! - [`NetemStatsReader`]: handle resolution, kind check and snapshot copy
//! - [`ReadStatsCapability`]: the reader as published to programs
//! - [`NetemModule`]: loads the netem discipline and the capability together, or neither

/// `netem_read_stats` as published to extension programs.
pub mod capability;
pub mod module;
pub mod reader;
/// The statistics record written for programs.
pub mod snapshot;

pub use capability::{ReadStatsCapability, READ_STATS};
pub use module::{InitError, NetemModule, MODULE_NAME, STATS_PROGRAM_TYPE};
pub use reader::{NetemStatsReader, StatsError};
pub use snapshot::Snapshot;
