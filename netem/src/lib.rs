#![doc(issue_tracker_base_url = "https://github.com/chainbound/netem-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Network emulation queuing discipline with a read-only statistics surface for extension
//! programs.
//!
//! ```
//! use netem::{
//!     ext::{Arg, ProgramType},
//!     Handle, Host, LinkImpairment, NetemModule, Packet, PacketContext, QdiscSpec, Snapshot,
//!     READ_STATS,
//! };
//!
//! let host = Host::new();
//! let _module = NetemModule::init(&host).unwrap();
//!
//! let eth0 = host.registry().add_device("eth0").unwrap();
//! let handle = Handle::new(7, 0);
//! let spec = QdiscSpec::Netem(LinkImpairment::default().with_latency(10_000));
//! let qdisc = host.registry().create_qdisc(eth0, handle, spec).unwrap();
//! qdisc.enqueue(Packet::new(vec![0u8; 500]), std::time::Instant::now());
//!
//! let mut out = [0u8; Snapshot::SIZE];
//! let rc = host.capabilities().invoke(
//!     ProgramType::SchedCls,
//!     READ_STATS,
//!     &PacketContext::new(eth0),
//!     &mut [Arg::Scalar(handle.as_raw().into()), Arg::Mem(&mut out)],
//! );
//! assert_eq!(rc, 0);
//! assert_eq!(
//!     Snapshot::from_bytes(&out),
//!     Some(Snapshot { queue_length: 1, backlog_bytes: 500 })
//! );
//! ```

pub use netem_host::*;
pub use netem_sched::*;
pub use netem_stats::*;
