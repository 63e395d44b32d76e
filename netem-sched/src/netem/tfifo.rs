use std::{collections::BTreeMap, time::Instant};

use crate::packet::Packet;

/// Time-ordered packet queue.
///
/// Packets are keyed by their send time; packets with equal send times leave in insertion
/// order.
#[derive(Debug, Default)]
pub(crate) struct Tfifo {
    queue: BTreeMap<(Instant, u64), Packet>,
    seq: u64,
}

impl Tfifo {
    pub(crate) fn push(&mut self, time_to_send: Instant, packet: Packet) {
        self.seq = self.seq.wrapping_add(1);
        self.queue.insert((time_to_send, self.seq), packet);
    }

    /// The send time of the earliest packet.
    pub(crate) fn peek_time(&self) -> Option<Instant> {
        self.queue.first_key_value().map(|((time, _), _)| *time)
    }

    /// Remove the earliest packet if it is due at `now`.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<Packet> {
        let entry = self.queue.first_entry()?;
        if entry.key().0 > now {
            return None;
        }
        Some(entry.remove())
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn pops_in_time_order_then_fifo() {
        let now = Instant::now();
        let mut tfifo = Tfifo::default();
        tfifo.push(now + Duration::from_millis(20), Packet::new("late"));
        tfifo.push(now + Duration::from_millis(10), Packet::new("first"));
        tfifo.push(now + Duration::from_millis(10), Packet::new("second"));

        assert_eq!(tfifo.peek_time(), Some(now + Duration::from_millis(10)));
        assert_eq!(tfifo.pop_due(now), None);

        let later = now + Duration::from_millis(30);
        assert_eq!(tfifo.pop_due(later).unwrap().data().as_ref(), b"first");
        assert_eq!(tfifo.pop_due(later).unwrap().data().as_ref(), b"second");
        assert_eq!(tfifo.pop_due(later).unwrap().data().as_ref(), b"late");
        assert_eq!(tfifo.len(), 0);
    }
}
