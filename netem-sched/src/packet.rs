use bytes::Bytes;

/// A packet travelling through a qdisc.
///
/// Cloning is cheap: the payload is reference counted, which is also how duplicated packets
/// share their bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    data: Bytes,
}

impl Packet {
    /// Wrap a payload.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Length in bytes, as accounted in the qdisc backlog.
    #[inline]
    pub fn len(&self) -> u32 {
        u32::try_from(self.data.len()).unwrap_or(u32::MAX)
    }

    /// Returns `true` for a zero-length packet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the packet, returning its payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

/// Outcome of offering a packet to a qdisc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The packet (and any duplicate) was queued.
    Queued,
    /// The packet was lost by the emulated link. Reported as success to the sender, like
    /// netem does.
    Lost,
    /// The queue was full and the packet was dropped.
    Dropped,
}

impl Verdict {
    /// Returns `true` if the sender should consider the packet accepted.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Queued | Self::Lost)
    }
}
