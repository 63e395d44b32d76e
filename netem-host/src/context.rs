use netem_sched::Packet;

use crate::registry::IfIndex;

/// Execution context of the packet an extension program is running on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketContext {
    ifindex: IfIndex,
    len: u32,
    mark: u32,
    priority: u32,
}

impl PacketContext {
    /// A context for a packet on the interface `ifindex`.
    pub const fn new(ifindex: IfIndex) -> Self {
        Self { ifindex, len: 0, mark: 0, priority: 0 }
    }

    /// A context for `packet` on the interface `ifindex`.
    pub fn for_packet(ifindex: IfIndex, packet: &Packet) -> Self {
        Self::new(ifindex).with_len(packet.len())
    }

    /// Set the packet length.
    pub const fn with_len(mut self, len: u32) -> Self {
        self.len = len;
        self
    }

    /// Set the firewall mark.
    pub const fn with_mark(mut self, mark: u32) -> Self {
        self.mark = mark;
        self
    }

    /// Set the packet priority.
    pub const fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// The interface the packet is on.
    #[inline]
    pub const fn ifindex(&self) -> IfIndex {
        self.ifindex
    }

    /// The packet length in bytes.
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Returns `true` for a zero-length packet.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The firewall mark.
    pub const fn mark(&self) -> u32 {
        self.mark
    }

    /// The packet priority.
    pub const fn priority(&self) -> u32 {
        self.priority
    }
}
