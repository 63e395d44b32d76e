use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    thread,
    time::{Duration, Instant},
};

use netem::{
    Handle, Host, IfIndex, LinkImpairment, NetemModule, Packet, PacketContext, QdiscSpec,
    Snapshot, StatsError,
};
use rand::Rng;

const PACKET_SIZE: u32 = 128;
const PRODUCERS: usize = 4;
const READERS: usize = 4;
const RUN_FOR: Duration = Duration::from_millis(300);

fn setup() -> (Host, NetemModule, IfIndex) {
    let _ = tracing_subscriber::fmt::try_init();
    let host = Host::new();
    let module = NetemModule::init(&host).unwrap();
    let eth0 = host.registry().add_device("eth0").unwrap();
    (host, module, eth0)
}

fn assert_consistent(snapshot: Snapshot) {
    assert_eq!(
        snapshot.backlog_bytes,
        snapshot.queue_length * PACKET_SIZE,
        "torn snapshot: {snapshot:?}"
    );
}

#[test]
fn snapshots_never_tear_under_load() {
    let (host, module, eth0) = setup();
    let handle = Handle::new(1, 0);
    let spec = QdiscSpec::Netem(
        LinkImpairment::default().with_latency(200).with_jitter(100).with_limit(10_000),
    );
    let qdisc = host.registry().create_qdisc(eth0, handle, spec).unwrap();

    let stop = AtomicBool::new(false);
    let reads = AtomicU64::new(0);

    thread::scope(|s| {
        for _ in 0..PRODUCERS {
            s.spawn(|| {
                while !stop.load(Ordering::Relaxed) {
                    qdisc.enqueue(Packet::new(vec![0u8; PACKET_SIZE as usize]), Instant::now());
                }
            });
        }

        s.spawn(|| {
            while !stop.load(Ordering::Relaxed) {
                while qdisc.dequeue(Instant::now()).is_some() {}
                thread::yield_now();
            }
        });

        for _ in 0..READERS {
            s.spawn(|| {
                let ctx = PacketContext::new(eth0);
                let mut out = Snapshot::default();
                while !stop.load(Ordering::Relaxed) {
                    module.reader().read_stats(&ctx, handle.as_raw(), &mut out).unwrap();
                    assert_consistent(out);
                    assert!(out.queue_length <= 10_000);
                    reads.fetch_add(1, Ordering::Relaxed);
                }
            });
        }

        thread::sleep(RUN_FOR);
        stop.store(true, Ordering::Relaxed);
    });

    tracing::info!(reads = reads.load(Ordering::Relaxed), "concurrent reads done");
    assert!(reads.load(Ordering::Relaxed) > 0);
}

#[test]
fn reads_survive_delete_and_recreate() {
    let (host, module, eth0) = setup();
    let handles: Vec<_> = (1..=4).map(|major| Handle::new(major, 0)).collect();
    for &handle in &handles {
        host.registry().create_qdisc(eth0, handle, QdiscSpec::netem()).unwrap();
    }

    let stop = AtomicBool::new(false);
    let (found, missing) = (AtomicU64::new(0), AtomicU64::new(0));

    thread::scope(|s| {
        // Churn: delete a random handle and put a fresh instance back, partially filled.
        s.spawn(|| {
            let mut rng = rand::thread_rng();
            while !stop.load(Ordering::Relaxed) {
                let handle = handles[rng.gen_range(0..handles.len())];
                host.registry().delete_qdisc(eth0, handle).unwrap();
                let qdisc = host.registry().create_qdisc(eth0, handle, QdiscSpec::netem()).unwrap();
                for _ in 0..rng.gen_range(0..8) {
                    qdisc.enqueue(Packet::new(vec![0u8; PACKET_SIZE as usize]), Instant::now());
                }
            }
        });

        for _ in 0..READERS {
            s.spawn(|| {
                let ctx = PacketContext::new(eth0);
                let mut rng = rand::thread_rng();
                while !stop.load(Ordering::Relaxed) {
                    let handle = handles[rng.gen_range(0..handles.len())];
                    let mut out = Snapshot::default();
                    match module.reader().read_stats(&ctx, handle.as_raw(), &mut out) {
                        Ok(()) => {
                            assert_consistent(out);
                            found.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(StatsError::NotFound(h)) => {
                            assert_eq!(h, handle);
                            assert_eq!(out, Snapshot::default());
                            missing.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            });
        }

        thread::sleep(RUN_FOR);
        stop.store(true, Ordering::Relaxed);
    });

    assert!(found.load(Ordering::Relaxed) > 0);
    tracing::info!(
        found = found.load(Ordering::Relaxed),
        missing = missing.load(Ordering::Relaxed),
        "churn reads done"
    );
}

#[test]
fn resolved_instance_outlives_deletion() {
    let (host, _module, eth0) = setup();
    let handle = Handle::new(3, 0);
    let qdisc = host.registry().create_qdisc(eth0, handle, QdiscSpec::netem()).unwrap();
    qdisc.enqueue(Packet::new(vec![0u8; PACKET_SIZE as usize]), Instant::now());

    let held = host.registry().qdisc(eth0, handle).unwrap();
    host.registry().delete_qdisc(eth0, handle).unwrap();
    drop(qdisc);

    // Still a valid instance, emptied by the delete.
    assert_eq!(held.handle(), handle);
    assert_eq!(held.counters().qlen, 0);
    assert!(held.dequeue(Instant::now()).is_none());
}
