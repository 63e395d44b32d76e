use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time pair of queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct QueueCounters {
    /// Number of packets queued.
    pub qlen: u32,
    /// Number of bytes queued.
    pub backlog: u32,
}

impl QueueCounters {
    #[inline]
    const fn pack(self) -> u64 {
        ((self.qlen as u64) << 32) | self.backlog as u64
    }

    #[inline]
    const fn unpack(word: u64) -> Self {
        Self { qlen: (word >> 32) as u32, backlog: word as u32 }
    }
}

/// Queue counters published as a single atomic word.
///
/// Both halves are written by one store, so a reader never observes `qlen` from one update
/// and `backlog` from another. Only the qdisc's own enqueue/dequeue path stores; anyone may
/// load without taking the qdisc lock.
#[derive(Debug, Default)]
pub struct AtomicQueueCounters(AtomicU64);

impl AtomicQueueCounters {
    /// Publish a new pair.
    #[inline]
    pub(crate) fn store(&self, counters: QueueCounters) {
        self.0.store(counters.pack(), Ordering::Release);
    }

    /// Read the current pair.
    #[inline]
    pub fn load(&self) -> QueueCounters {
        QueueCounters::unpack(self.0.load(Ordering::Acquire))
    }
}
