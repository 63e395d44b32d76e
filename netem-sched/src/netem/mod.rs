//! The netem (Network Emulator) discipline.
//!
//! Netem is the workhorse of network simulation, providing:
//! - Latency (fixed delay)
//! - Jitter (random delay variation)
//! - Packet loss (random drops)
//! - Packet duplication
//! - Packet reordering
//!
//! # Queue structure
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!   enqueue ────► │ duplicate? lost? over limit? │
//!                 └──────────────────────────────┘
//!                      │                   │
//!           reorder hit│                   │ otherwise
//!                      ▼                   ▼
//!              ┌──────────────┐   ┌──────────────────────────┐
//!              │  head queue  │   │  tfifo (by send time)    │
//!              │  (LIFO push) │   │  now + latency ± jitter  │
//!              └──────────────┘   └──────────────────────────┘
//!                      │                   │
//!                      └───── dequeue ─────┘   head first, then due tfifo packets
//! ```
//!
//! All queue state lives behind one lock. After every mutation the queue length and backlog
//! are republished as an [`AtomicQueueCounters`] pair, which is what observers read.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng as _, SeedableRng as _};
use tracing::{debug, trace};

use crate::{
    counters::{AtomicQueueCounters, QueueCounters},
    handle::Handle,
    impairment::{ConfigError, LinkImpairment},
    packet::{Packet, Verdict},
};

pub mod qopt;
mod tfifo;

use tfifo::Tfifo;

/// Cumulative netem statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetemStats {
    /// Packets dequeued.
    pub packets: u64,
    /// Bytes dequeued.
    pub bytes: u64,
    /// Packets dropped because the queue was full.
    pub drops: u64,
    /// Packets lost by the emulated link.
    pub lost: u64,
    /// Duplicate copies queued.
    pub duplicated: u64,
    /// Packets sent ahead of the delay line.
    pub reordered: u64,
}

#[derive(Debug)]
struct NetemState {
    config: LinkImpairment,
    rng: StdRng,
    /// Packets that skipped the delay line, with their enqueue time.
    head: VecDeque<(Instant, Packet)>,
    tfifo: Tfifo,
    /// Packets delayed since the last reorder.
    counter: u32,
    counters: QueueCounters,
    stats: NetemStats,
}

impl NetemState {
    fn new(config: LinkImpairment) -> Self {
        Self {
            rng: make_rng(&config),
            config,
            head: VecDeque::new(),
            tfifo: Tfifo::default(),
            counter: 0,
            counters: QueueCounters::default(),
            stats: NetemStats::default(),
        }
    }

    /// Roll a `percent` chance.
    fn chance(&mut self, percent: f64) -> bool {
        percent > 0.0 && self.rng.gen::<f64>() * 100.0 < percent
    }

    /// Draw a delay of `latency ± jitter`, never negative.
    fn delay(&mut self) -> Duration {
        let latency = self.config.latency as i64;
        let jitter = self.config.jitter as i64;
        let usec = if jitter == 0 { latency } else { latency + self.rng.gen_range(-jitter..=jitter) };

        Duration::from_micros(usec.max(0) as u64)
    }

    fn insert(&mut self, packet: Packet, now: Instant) {
        let len = packet.len();
        let gap = self.config.gap;
        let reorder = self.config.reorder;

        if gap == 0 || self.counter < gap - 1 || !self.chance(reorder) {
            let time_to_send = now + self.delay();
            self.tfifo.push(time_to_send, packet);
            self.counter = self.counter.saturating_add(1);
        } else {
            // Skip the delay line: this packet overtakes everything still waiting.
            self.counter = 0;
            self.head.push_front((now, packet));
            self.stats.reordered += 1;
        }

        self.counters.qlen += 1;
        self.counters.backlog = self.counters.backlog.saturating_add(len);
    }

    fn pop(&mut self, now: Instant) -> Option<Packet> {
        let packet = match self.head.pop_front() {
            Some((_, packet)) => packet,
            None => self.tfifo.pop_due(now)?,
        };

        let len = packet.len();
        self.counters.qlen -= 1;
        self.counters.backlog = self.counters.backlog.saturating_sub(len);
        self.stats.packets += 1;
        self.stats.bytes += len as u64;

        Some(packet)
    }
}

fn make_rng(config: &LinkImpairment) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// A netem qdisc instance.
#[derive(Debug)]
pub struct NetemQdisc {
    handle: Handle,
    state: Mutex<NetemState>,
    counters: AtomicQueueCounters,
}

impl NetemQdisc {
    /// Create a netem qdisc with the given impairments.
    pub fn new(handle: Handle, config: LinkImpairment) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            handle,
            state: Mutex::new(NetemState::new(config)),
            counters: AtomicQueueCounters::default(),
        })
    }

    /// This qdisc's handle.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Offer a packet arriving at `now`.
    pub fn enqueue(&self, packet: Packet, now: Instant) -> Verdict {
        let mut state = self.state.lock();

        // Random duplication
        let mut count = 1;
        let duplicate = state.config.duplicate;
        if state.chance(duplicate) {
            count += 1;
        }

        // Random packet drop
        let loss = state.config.loss;
        if state.chance(loss) {
            count -= 1;
        }

        if count == 0 {
            state.stats.lost += 1;
            return Verdict::Lost;
        }

        if state.counters.qlen >= state.config.limit {
            state.stats.drops += 1;
            trace!(handle = %self.handle, limit = state.config.limit, "queue full, dropping");
            return Verdict::Dropped;
        }

        if count > 1 {
            if state.counters.qlen + 1 < state.config.limit {
                state.insert(packet.clone(), now);
                state.stats.duplicated += 1;
            } else {
                state.stats.drops += 1;
            }
        }

        state.insert(packet, now);
        self.counters.store(state.counters);

        Verdict::Queued
    }

    /// Take the next packet that is ready to leave at `now`.
    pub fn dequeue(&self, now: Instant) -> Option<Packet> {
        let mut state = self.state.lock();
        let packet = state.pop(now)?;
        self.counters.store(state.counters);

        Some(packet)
    }

    /// The earliest time at which [`Self::dequeue`] will return a packet, if any is queued.
    pub fn next_send_time(&self) -> Option<Instant> {
        let state = self.state.lock();
        match state.head.front() {
            Some((enqueued, _)) => Some(*enqueued),
            None => state.tfifo.peek_time(),
        }
    }

    /// Replace the impairments. Queued packets keep their send times.
    pub fn change(&self, config: LinkImpairment) -> Result<(), ConfigError> {
        config.validate()?;

        let mut state = self.state.lock();
        if config.seed.is_some() && config.seed != state.config.seed {
            state.rng = make_rng(&config);
        }
        state.config = config;
        state.counter = 0;

        debug!(handle = %self.handle, ?config, "netem configuration changed");
        Ok(())
    }

    /// Drop every queued packet.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.head.clear();
        state.tfifo.clear();
        state.counter = 0;
        state.counters = QueueCounters::default();
        self.counters.store(state.counters);
    }

    /// The current queue length and backlog, read without taking the queue lock.
    ///
    /// Both values come from one atomic load and so always describe the same instant.
    #[inline]
    pub fn counters(&self) -> QueueCounters {
        self.counters.load()
    }

    /// The active configuration.
    pub fn config(&self) -> LinkImpairment {
        self.state.lock().config
    }

    /// Cumulative statistics.
    pub fn stats(&self) -> NetemStats {
        self.state.lock().stats
    }

    /// Number of queued packets, counted from the queues themselves.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.head.len() + state.tfifo.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
