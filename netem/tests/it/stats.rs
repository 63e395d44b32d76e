use std::time::{Duration, Instant};

use netem::{
    ext::{Arg, ProgramType},
    Handle, Host, IfIndex, LinkImpairment, NetemModule, Packet, PacketContext, QdiscSpec,
    Snapshot, READ_STATS,
};

const ENOENT: i32 = -2;
const EINVAL: i32 = -22;
const EOPNOTSUPP: i32 = -95;

/// A host with the module loaded and one device carrying a netem qdisc `7:` (10ms of delay)
/// and a pfifo qdisc `4:`.
fn setup() -> (Host, NetemModule, IfIndex) {
    let _ = tracing_subscriber::fmt::try_init();

    let host = Host::new();
    let module = NetemModule::init(&host).unwrap();
    host.disciplines().register(netem::QdiscOps::for_kind(netem::QdiscKind::Pfifo)).unwrap();

    let eth0 = host.registry().add_device("eth0").unwrap();
    let netem = QdiscSpec::Netem(LinkImpairment::default().with_latency(10_000));
    host.registry().create_qdisc(eth0, Handle::new(7, 0), netem).unwrap();
    host.registry().create_qdisc(eth0, Handle::new(4, 0), QdiscSpec::pfifo()).unwrap();

    (host, module, eth0)
}

/// Call the capability the way a classifier program would.
fn call(host: &Host, ifindex: IfIndex, handle: Handle, out: &mut [u8]) -> i32 {
    host.capabilities().invoke(
        ProgramType::SchedCls,
        READ_STATS,
        &PacketContext::new(ifindex),
        &mut [Arg::Scalar(handle.as_raw().into()), Arg::Mem(out)],
    )
}

fn enqueue(host: &Host, ifindex: IfIndex, handle: Handle, packets: usize, size: usize, now: Instant) {
    let qdisc = host.registry().qdisc(ifindex, handle).unwrap();
    for _ in 0..packets {
        assert!(qdisc.enqueue(Packet::new(vec![0u8; size]), now).is_success());
    }
}

#[test]
fn reads_queue_length_and_backlog() {
    let (host, _module, eth0) = setup();
    enqueue(&host, eth0, Handle::new(7, 0), 3, 500, Instant::now());

    let mut out = [0u8; Snapshot::SIZE];
    assert_eq!(call(&host, eth0, Handle::new(7, 0), &mut out), 0);
    assert_eq!(Snapshot::from_bytes(&out), Some(Snapshot { queue_length: 3, backlog_bytes: 1_500 }));
}

#[test]
fn empty_qdisc_reads_zero() {
    let (host, _module, eth0) = setup();

    let mut out = [0xffu8; Snapshot::SIZE];
    assert_eq!(call(&host, eth0, Handle::new(7, 0), &mut out), 0);
    assert_eq!(Snapshot::from_bytes(&out), Some(Snapshot::default()));
}

#[test]
fn counters_follow_dequeue() {
    let (host, module, eth0) = setup();
    let handle = Handle::new(7, 0);
    let start = Instant::now();
    enqueue(&host, eth0, handle, 4, 250, start);

    let qdisc = host.registry().qdisc(eth0, handle).unwrap();
    assert!(qdisc.dequeue(start).is_none());

    let later = start + Duration::from_millis(10);
    assert!(qdisc.dequeue(later).is_some());
    assert!(qdisc.dequeue(later).is_some());

    let mut out = Snapshot::default();
    module.reader().read_stats(&PacketContext::new(eth0), handle.as_raw(), &mut out).unwrap();
    assert_eq!(out, Snapshot { queue_length: 2, backlog_bytes: 500 });
}

#[test]
fn unknown_handle_is_enoent_and_output_untouched() {
    let (host, _module, eth0) = setup();
    enqueue(&host, eth0, Handle::new(7, 0), 3, 500, Instant::now());

    let mut out = [0xaau8; Snapshot::SIZE];
    assert_eq!(call(&host, eth0, Handle::new(99, 0), &mut out), ENOENT);
    assert_eq!(out, [0xaa; Snapshot::SIZE]);

    // The handle exists, but on another interface.
    let eth1 = host.registry().add_device("eth1").unwrap();
    assert_eq!(call(&host, eth1, Handle::new(7, 0), &mut out), ENOENT);
    assert_eq!(out, [0xaa; Snapshot::SIZE]);
}

#[test]
fn other_kind_is_eopnotsupp_and_output_untouched() {
    let (host, _module, eth0) = setup();
    enqueue(&host, eth0, Handle::new(4, 0), 2, 100, Instant::now());

    let mut out = [0x55u8; Snapshot::SIZE];
    assert_eq!(call(&host, eth0, Handle::new(4, 0), &mut out), EOPNOTSUPP);
    assert_eq!(out, [0x55; Snapshot::SIZE]);
}

#[test]
fn bad_arguments_are_einval() {
    let (host, _module, eth0) = setup();
    let ctx = PacketContext::new(eth0);

    let mut short = [0u8; Snapshot::SIZE - 1];
    assert_eq!(call(&host, eth0, Handle::new(7, 0), &mut short), EINVAL);

    let rc = host.capabilities().invoke(
        ProgramType::SchedCls,
        READ_STATS,
        &ctx,
        &mut [Arg::Scalar(Handle::new(7, 0).as_raw().into())],
    );
    assert_eq!(rc, EINVAL);

    // Wider than any handle.
    let mut out = [0u8; Snapshot::SIZE];
    let rc = host.capabilities().invoke(
        ProgramType::SchedCls,
        READ_STATS,
        &ctx,
        &mut [Arg::Scalar(u64::MAX), Arg::Mem(&mut out)],
    );
    assert_eq!(rc, ENOENT);
}

#[test]
fn deleted_qdisc_is_not_found_and_reused_handle_reads_fresh() {
    let (host, _module, eth0) = setup();
    let handle = Handle::new(7, 0);
    enqueue(&host, eth0, handle, 3, 500, Instant::now());

    let old = host.registry().delete_qdisc(eth0, handle).unwrap();
    let mut out = [0u8; Snapshot::SIZE];
    assert_eq!(call(&host, eth0, handle, &mut out), ENOENT);
    // Deletion drops whatever was queued.
    assert_eq!(old.counters().qlen, 0);

    host.registry().create_qdisc(eth0, handle, QdiscSpec::netem()).unwrap();
    enqueue(&host, eth0, handle, 1, 64, Instant::now());
    assert_eq!(call(&host, eth0, handle, &mut out), 0);
    assert_eq!(Snapshot::from_bytes(&out), Some(Snapshot { queue_length: 1, backlog_bytes: 64 }));
}

#[test]
fn only_classifiers_see_the_capability() {
    let (host, _module, eth0) = setup();
    let mut out = [0u8; Snapshot::SIZE];

    for prog_type in [ProgramType::Xdp, ProgramType::SchedAct, ProgramType::Tracing] {
        assert!(host.capabilities().resolve(prog_type, READ_STATS).is_none());
        let rc = host.capabilities().invoke(
            prog_type,
            READ_STATS,
            &PacketContext::new(eth0),
            &mut [Arg::Scalar(Handle::new(7, 0).as_raw().into()), Arg::Mem(&mut out)],
        );
        assert_eq!(rc, ENOENT);
    }
}
