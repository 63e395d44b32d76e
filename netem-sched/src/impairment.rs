//! Link impairment configuration.
//!
//! This module defines the user-facing configuration of a netem qdisc: the ways a link is
//! degraded for testing purposes.

use thiserror::Error;

/// Errors raised by [`LinkImpairment::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A probability was outside `0.0..=100.0`.
    #[error("{field} must be a percentage in 0..=100, got {value}")]
    Percentage {
        /// The offending field.
        field: &'static str,
        /// The value supplied.
        value: f64,
    },
    /// The queue limit was zero.
    #[error("queue limit must be at least one packet")]
    ZeroLimit,
}

/// Configuration for network impairments to apply to a link.
///
/// Each field maps to a feature of Linux's `netem` qdisc.
///
/// # Example
///
/// ```
/// use netem_sched::impairment::LinkImpairment;
///
/// // Simulate a lossy, high-latency satellite link
/// let satellite_link = LinkImpairment {
///     latency: 300_000, // 300ms one-way delay
///     jitter: 50_000,   // ±50ms variation
///     loss: 1.0,        // 1% packet loss
///     ..Default::default()
/// };
///
/// // Simulate a local network with occasional issues
/// let flaky_lan = LinkImpairment::default().with_latency(1_000).with_duplicate(0.1);
/// # assert!(satellite_link.validate().is_ok() && flaky_lan.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkImpairment {
    /// Base latency to add to all packets, in microseconds.
    pub latency: u32,

    /// Random jitter added to latency, in microseconds.
    ///
    /// The actual delay for each packet is `latency ± jitter` (uniform distribution), never
    /// less than zero.
    pub jitter: u32,

    /// Maximum number of packets that can be queued.
    ///
    /// When this limit is reached, additional packets are dropped. Default is 1000, which
    /// matches netem's default.
    pub limit: u32,

    /// Packet loss percentage (0.0 to 100.0).
    pub loss: f64,

    /// Packet duplication percentage (0.0 to 100.0).
    pub duplicate: f64,

    /// Probability (0.0 to 100.0) that a packet eligible for reordering is sent immediately.
    pub reorder: f64,

    /// Packet reordering gap.
    ///
    /// When non-zero, every `gap`-th packet is a candidate to skip the delay line and be
    /// sent immediately (subject to `reorder`), overtaking delayed packets.
    pub gap: u32,

    /// Seed for the random source. When `None`, the qdisc seeds from system entropy.
    pub seed: Option<u64>,
}

impl Default for LinkImpairment {
    fn default() -> Self {
        Self {
            latency: 0,
            jitter: 0,
            limit: 1_000, // netem default limit
            loss: 0.0,
            duplicate: 0.0,
            reorder: 0.0,
            gap: 0,
            seed: None,
        }
    }
}

impl LinkImpairment {
    /// Set the base latency, in microseconds.
    pub fn with_latency(mut self, latency: u32) -> Self {
        self.latency = latency;
        self
    }

    /// Set the jitter, in microseconds.
    pub fn with_jitter(mut self, jitter: u32) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set the queue limit, in packets.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the loss percentage.
    pub fn with_loss(mut self, loss: f64) -> Self {
        self.loss = loss;
        self
    }

    /// Set the duplication percentage.
    pub fn with_duplicate(mut self, duplicate: f64) -> Self {
        self.duplicate = duplicate;
        self
    }

    /// Set the reordering gap and probability.
    pub fn with_reorder(mut self, gap: u32, reorder: f64) -> Self {
        self.gap = gap;
        self.reorder = reorder;
        self
    }

    /// Seed the random source, making the emulation deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that probabilities are percentages and the limit is non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in
            [("loss", self.loss), ("duplicate", self.duplicate), ("reorder", self.reorder)]
        {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Percentage { field, value });
            }
        }

        if self.limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }

        Ok(())
    }

    /// Returns `true` if packets can be sent ahead of the delay line.
    pub fn reorders(&self) -> bool {
        self.gap > 0 && self.reorder > 0.0
    }
}

/// Convert a percentage (0-100) to the kernel's probability representation.
///
/// The kernel expects probabilities as values from 0 to [`u32::MAX`], where [`u32::MAX`]
/// represents 100% probability.
pub fn u32_probability(percent: f64) -> u32 {
    (percent / 100.0 * u32::MAX as f64) as u32
}

/// Inverse of [`u32_probability`].
pub fn percent_from_u32(probability: u32) -> f64 {
    probability as f64 / u32::MAX as f64 * 100.0
}
