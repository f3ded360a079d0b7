//! Relay traffic counters.

use crate::relay::Direction;

/// Packet and byte counters for one traffic direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionCounters {
    /// Datagrams counted
    pub packets: u64,
    /// Payload bytes counted
    pub bytes: u64,
}

impl DirectionCounters {
    fn record(&mut self, bytes: usize) {
        self.packets += 1;
        self.bytes += bytes as u64;
    }
}

/// Relay statistics
///
/// "received" counts datagrams arriving from a peer, "sent" counts
/// datagrams forwarded to a peer. Datagrams from a source port matching
/// neither peer are dropped and counted under `unknown_dropped`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayStats {
    /// Datagrams received from the north peer
    pub received_north: DirectionCounters,
    /// Datagrams received from the south peer
    pub received_south: DirectionCounters,
    /// Datagrams sent to the north peer
    pub sent_north: DirectionCounters,
    /// Datagrams sent to the south peer
    pub sent_south: DirectionCounters,
    /// Datagrams dropped because their source port matched neither peer
    pub unknown_dropped: u64,
    /// Transport-level receive failures
    pub recv_errors: u64,
    /// Transport-level send failures, including short writes
    pub send_errors: u64,
}

impl RelayStats {
    /// Create empty statistics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a datagram received from `dir`
    pub fn record_recv(&mut self, dir: Direction, bytes: usize) {
        match dir {
            Direction::North => self.received_north.record(bytes),
            Direction::South => self.received_south.record(bytes),
        }
    }

    /// Record a datagram sent to `dir`
    pub fn record_send(&mut self, dir: Direction, bytes: usize) {
        match dir {
            Direction::North => self.sent_north.record(bytes),
            Direction::South => self.sent_south.record(bytes),
        }
    }

    /// Record a datagram dropped for an unknown source port
    pub fn record_unknown(&mut self) {
        self.unknown_dropped += 1;
    }

    /// Record a receive failure
    pub fn record_recv_error(&mut self) {
        self.recv_errors += 1;
    }

    /// Record a send failure
    pub fn record_send_error(&mut self) {
        self.send_errors += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut stats = RelayStats::new();
        assert_eq!(stats.received_north.packets, 0);

        stats.record_recv(Direction::North, 100);
        stats.record_recv(Direction::North, 50);
        stats.record_recv(Direction::South, 10);
        assert_eq!(stats.received_north.packets, 2);
        assert_eq!(stats.received_north.bytes, 150);
        assert_eq!(stats.received_south.packets, 1);

        stats.record_send(Direction::South, 150);
        assert_eq!(stats.sent_south.bytes, 150);
        assert_eq!(stats.sent_north.packets, 0);

        stats.record_unknown();
        stats.record_recv_error();
        stats.record_send_error();
        assert_eq!(stats.unknown_dropped, 1);
        assert_eq!(stats.recv_errors, 1);
        assert_eq!(stats.send_errors, 1);
    }
}
