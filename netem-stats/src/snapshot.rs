use netem_sched::QueueCounters;

/// Point-in-time copy of a netem qdisc's queue length and backlog.
///
/// This is the output record extension programs pass in. The layout is fixed: two native
/// endian `u32`s, `queue_length` first, 8 bytes in total.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Snapshot {
    /// Packets queued.
    pub queue_length: u32,
    /// Bytes queued.
    pub backlog_bytes: u32,
}

impl Snapshot {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    /// Serialize in the layout programs read.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[..4].copy_from_slice(&self.queue_length.to_ne_bytes());
        buf[4..].copy_from_slice(&self.backlog_bytes.to_ne_bytes());
        buf
    }

    /// Decode from the first [`Self::SIZE`] bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let queue_length = bytes.get(..4)?.try_into().ok().map(u32::from_ne_bytes)?;
        let backlog_bytes = bytes.get(4..8)?.try_into().ok().map(u32::from_ne_bytes)?;
        Some(Self { queue_length, backlog_bytes })
    }
}

impl From<QueueCounters> for Snapshot {
    fn from(counters: QueueCounters) -> Self {
        Self { queue_length: counters.qlen, backlog_bytes: counters.backlog }
    }
}
