//! The kernel's `tc_netem_qopt` encoding.

use thiserror::Error;

use crate::{
    impairment::{percent_from_u32, u32_probability, LinkImpairment},
    psched::{ticks_to_usec_with, usec_to_ticks_with, TICK_IN_USEC},
};

/// Error decoding a [`NetemQopt`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QoptError {
    /// The buffer is shorter than the structure.
    #[error("tc_netem_qopt needs {expected} bytes, got {got}")]
    Truncated {
        /// Required length.
        expected: usize,
        /// Supplied length.
        got: usize,
    },
}

/// The kernel's `tc_netem_qopt` structure for netem configuration.
///
/// Field order matters! The kernel expects these fields in this specific sequence.
///
/// From `<linux/pkt_sched.h>`:
///
/// ```c
/// struct tc_netem_qopt {
///     __u32 latency;    /* Delay in scheduler ticks */
///     __u32 limit;      /* Queue size limit in packets */
///     __u32 loss;       /* Loss probability (0 to 2^32-1) */
///     __u32 gap;        /* Reordering gap */
///     __u32 duplicate;  /* Duplication probability */
///     __u32 jitter;     /* Jitter in scheduler ticks */
/// };
/// ```
///
/// The reorder probability and the random seed are not part of this structure (the kernel
/// carries them in separate attributes), so they do not survive an encode/decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetemQopt {
    /// Latency in packet scheduler ticks (not microseconds!).
    pub latency: u32,
    /// Maximum packets in queue.
    pub limit: u32,
    /// Loss probability, scaled to u32 range.
    pub loss: u32,
    /// Reordering gap.
    pub gap: u32,
    /// Duplication probability, scaled to u32 range.
    pub duplicate: u32,
    /// Jitter in packet scheduler ticks.
    pub jitter: u32,
}

impl NetemQopt {
    /// Encoded size in bytes.
    pub const SIZE: usize = 4 * 6;

    /// Convert a [`LinkImpairment`] using an explicit scheduler time base.
    pub fn from_impairment_with(value: &LinkImpairment, tick_in_usec: f64) -> Self {
        Self {
            latency: usec_to_ticks_with(value.latency, tick_in_usec),
            limit: value.limit,
            loss: u32_probability(value.loss),
            gap: value.gap,
            duplicate: u32_probability(value.duplicate),
            jitter: usec_to_ticks_with(value.jitter, tick_in_usec),
        }
    }

    /// Convert back to a [`LinkImpairment`] using an explicit scheduler time base.
    pub fn to_impairment_with(&self, tick_in_usec: f64) -> LinkImpairment {
        LinkImpairment {
            latency: ticks_to_usec_with(self.latency, tick_in_usec),
            jitter: ticks_to_usec_with(self.jitter, tick_in_usec),
            limit: self.limit,
            loss: percent_from_u32(self.loss),
            duplicate: percent_from_u32(self.duplicate),
            gap: self.gap,
            ..Default::default()
        }
    }

    /// Convert back to a [`LinkImpairment`] using the system time base.
    pub fn to_impairment(&self) -> LinkImpairment {
        self.to_impairment_with(*TICK_IN_USEC)
    }

    /// Serialize this structure to bytes, in native endian order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut vec = Vec::with_capacity(Self::SIZE);
        vec.extend_from_slice(&self.latency.to_ne_bytes());
        vec.extend_from_slice(&self.limit.to_ne_bytes());
        vec.extend_from_slice(&self.loss.to_ne_bytes());
        vec.extend_from_slice(&self.gap.to_ne_bytes());
        vec.extend_from_slice(&self.duplicate.to_ne_bytes());
        vec.extend_from_slice(&self.jitter.to_ne_bytes());
        vec
    }
}

impl TryFrom<&[u8]> for NetemQopt {
    type Error = QoptError;

    /// Decode from native-endian bytes. Trailing bytes are ignored, as the kernel does for
    /// newer userspace.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < Self::SIZE {
            return Err(QoptError::Truncated { expected: Self::SIZE, got: bytes.len() });
        }

        let field = |i: usize| {
            let mut word = [0u8; 4];
            word.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
            u32::from_ne_bytes(word)
        };

        Ok(Self {
            latency: field(0),
            limit: field(1),
            loss: field(2),
            gap: field(3),
            duplicate: field(4),
            jitter: field(5),
        })
    }
}

impl From<&LinkImpairment> for NetemQopt {
    /// Convert user-friendly [`LinkImpairment`] to kernel-friendly [`NetemQopt`].
    fn from(value: &LinkImpairment) -> Self {
        Self::from_impairment_with(value, *TICK_IN_USEC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psched::DEFAULT_TICK_IN_USEC;

    #[test]
    fn layout_follows_kernel_field_order() {
        let qopt = NetemQopt { latency: 1, limit: 2, loss: 3, gap: 4, duplicate: 5, jitter: 6 };
        let bytes = qopt.to_bytes();
        assert_eq!(bytes.len(), NetemQopt::SIZE);
        assert_eq!(&bytes[4..8], &2u32.to_ne_bytes());
        assert_eq!(&bytes[20..24], &6u32.to_ne_bytes());
        assert_eq!(NetemQopt::try_from(bytes.as_slice()).unwrap(), qopt);
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let err = NetemQopt::try_from(&[0u8; 23][..]).unwrap_err();
        assert_eq!(err, QoptError::Truncated { expected: 24, got: 23 });
    }

    #[test]
    fn impairment_conversion() {
        let imp =
            LinkImpairment::default().with_latency(100_000).with_jitter(10_000).with_loss(50.0);
        let qopt = NetemQopt::from_impairment_with(&imp, DEFAULT_TICK_IN_USEC);
        assert_eq!(qopt.latency, 1_562_500);
        assert_eq!(qopt.limit, 1_000);

        let back = qopt.to_impairment_with(DEFAULT_TICK_IN_USEC);
        assert_eq!(back.latency, 100_000);
        assert_eq!(back.jitter, 10_000);
        assert!((back.loss - 50.0).abs() < 1e-6);
    }
}
