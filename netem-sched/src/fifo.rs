use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::{
    counters::{AtomicQueueCounters, QueueCounters},
    handle::Handle,
    packet::{Packet, Verdict},
};

/// Default pfifo limit, in packets (the kernel uses the device tx queue length).
pub const DEFAULT_PFIFO_LIMIT: u32 = 1_000;

#[derive(Debug, Default)]
struct FifoState {
    queue: VecDeque<Packet>,
    counters: QueueCounters,
    drops: u64,
}

/// A plain packet FIFO with a packet limit.
#[derive(Debug)]
pub struct PfifoQdisc {
    handle: Handle,
    limit: u32,
    state: Mutex<FifoState>,
    counters: AtomicQueueCounters,
}

impl PfifoQdisc {
    /// Create a FIFO holding at most `limit` packets.
    pub fn new(handle: Handle, limit: u32) -> Self {
        Self {
            handle,
            limit,
            state: Mutex::new(FifoState::default()),
            counters: AtomicQueueCounters::default(),
        }
    }

    /// This qdisc's handle.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The packet limit.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Append a packet, or drop it if the queue is full.
    pub fn enqueue(&self, packet: Packet) -> Verdict {
        let mut state = self.state.lock();
        if state.counters.qlen >= self.limit {
            state.drops += 1;
            return Verdict::Dropped;
        }

        state.counters.qlen += 1;
        state.counters.backlog = state.counters.backlog.saturating_add(packet.len());
        state.queue.push_back(packet);
        self.counters.store(state.counters);

        Verdict::Queued
    }

    /// Take the oldest packet.
    pub fn dequeue(&self) -> Option<Packet> {
        let mut state = self.state.lock();
        let packet = state.queue.pop_front()?;
        state.counters.qlen -= 1;
        state.counters.backlog = state.counters.backlog.saturating_sub(packet.len());
        self.counters.store(state.counters);

        Some(packet)
    }

    /// Drop every queued packet.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.queue.clear();
        state.counters = QueueCounters::default();
        self.counters.store(state.counters);
    }

    /// The current queue length and backlog.
    pub fn counters(&self) -> QueueCounters {
        self.counters.load()
    }

    /// Packets dropped because the queue was full.
    pub fn drops(&self) -> u64 {
        self.state.lock().drops
    }
}
