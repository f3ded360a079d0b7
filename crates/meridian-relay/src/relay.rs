//! The relay core.
//!
//! One rendezvous socket receives from both peers interleaved, so every
//! receive call drains the socket and classifies each datagram by its
//! source port against the configured north/south ports. Classified
//! datagrams wait in a per-direction queue until their direction's receive
//! call pops them; datagrams from any other source port are dropped.
//!
//! The full source address observed for a direction becomes that
//! direction's send destination, so replies reach the peer's actual
//! (possibly ephemeral) socket. Before a peer has sent anything, sends
//! fall back to loopback at the configured port.
//!
//! Nothing here loops forever, blocks, spawns, or locks. The caller owns
//! the schedule.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::socket::RelaySocket;
use crate::stats::RelayStats;

/// Logical peer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The north peer
    North,
    /// The south peer
    South,
}

impl Direction {
    /// The other direction
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
        }
    }

    /// Lowercase name, for logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-direction peer state: identifying port, learned address, and the
/// queue of datagrams classified for this direction but not yet popped.
#[derive(Debug)]
struct PeerSlot {
    port: u16,
    learned: Option<SocketAddr>,
    queue: VecDeque<Vec<u8>>,
}

impl PeerSlot {
    fn new(port: u16) -> Self {
        Self {
            port,
            learned: None,
            queue: VecDeque::new(),
        }
    }

    fn dest(&self) -> SocketAddr {
        self.learned
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, self.port)))
    }

    fn reset(&mut self) {
        self.learned = None;
        self.queue.clear();
    }
}

/// The bidirectional UDP relay
///
/// Two-state machine: `Stopped` (no OS socket) and `Running` (exactly one
/// bound non-blocking socket, exclusively owned). All operations return
/// immediately; see the module docs for the forwarding model.
#[derive(Debug)]
pub struct Relay {
    config: RelayConfig,
    socket: Option<RelaySocket>,
    north: PeerSlot,
    south: PeerSlot,
    recv_buf: Vec<u8>,
    stats: RelayStats,
}

impl Relay {
    /// Create a stopped relay from a validated configuration.
    pub fn new(config: RelayConfig) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            socket: None,
            north: PeerSlot::new(config.north_port),
            south: PeerSlot::new(config.south_port),
            // Large enough for any UDP payload.
            recv_buf: vec![0u8; 65536],
            stats: RelayStats::new(),
        })
    }

    /// Bring the relay into the running state.
    ///
    /// Acquires, configures and binds the rendezvous socket. Any stage
    /// failing releases whatever was acquired and leaves the relay
    /// stopped. Starting an already-running relay is an error and leaves
    /// the live socket untouched.
    pub fn start(&mut self) -> RelayResult<()> {
        if self.socket.is_some() {
            return Err(RelayError::AlreadyRunning);
        }
        let socket = RelaySocket::bind(&self.config)?;
        if let Ok(addr) = socket.local_addr() {
            tracing::debug!(
                %addr,
                north_port = self.config.north_port,
                south_port = self.config.south_port,
                "relay started"
            );
        }
        self.socket = Some(socket);
        Ok(())
    }

    /// Release the socket and return to the stopped state.
    ///
    /// Queued datagrams and learned addresses are discarded. Idempotent.
    pub fn stop(&mut self) {
        if self.socket.take().is_some() {
            tracing::debug!("relay stopped");
        }
        self.north.reset();
        self.south.reset();
    }

    /// Whether the relay currently owns a bound socket.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.socket.is_some()
    }

    /// The address the rendezvous socket is bound to.
    pub fn local_addr(&self) -> RelayResult<SocketAddr> {
        match &self.socket {
            Some(socket) => socket.local_addr().map_err(RelayError::Recv),
            None => Err(RelayError::NotRunning),
        }
    }

    /// The configuration this relay was built from.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Traffic counters accumulated since construction.
    #[must_use]
    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Receive one datagram from the north peer, if any.
    pub fn recv_north(&mut self) -> RelayResult<Option<Vec<u8>>> {
        self.recv(Direction::North)
    }

    /// Receive one datagram from the south peer, if any.
    pub fn recv_south(&mut self) -> RelayResult<Option<Vec<u8>>> {
        self.recv(Direction::South)
    }

    /// Receive one datagram from the peer in `dir`, if any.
    ///
    /// Drains the socket first, classifying everything that arrived, then
    /// pops `dir`'s queue. `Ok(None)` means nothing is pending for this
    /// direction; it is not an error and the call still returned without
    /// blocking.
    pub fn recv(&mut self, dir: Direction) -> RelayResult<Option<Vec<u8>>> {
        let Some(socket) = &self.socket else {
            return Err(RelayError::NotRunning);
        };

        loop {
            match socket.recv_from(&mut self.recv_buf) {
                Ok((len, from)) => {
                    let arrived = if from.port() == self.north.port {
                        Direction::North
                    } else if from.port() == self.south.port {
                        Direction::South
                    } else {
                        tracing::warn!(%from, len, "dropping datagram from unknown source");
                        self.stats.record_unknown();
                        continue;
                    };

                    let slot = match arrived {
                        Direction::North => &mut self.north,
                        Direction::South => &mut self.south,
                    };
                    if slot.learned != Some(from) {
                        tracing::debug!(dir = %arrived, %from, "peer address learned");
                        slot.learned = Some(from);
                    }
                    slot.queue.push_back(self.recv_buf[..len].to_vec());
                    self.stats.record_recv(arrived, len);
                    tracing::trace!(dir = %arrived, len, "datagram queued");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    self.stats.record_recv_error();
                    return Err(RelayError::Recv(e));
                }
            }
        }

        let slot = match dir {
            Direction::North => &mut self.north,
            Direction::South => &mut self.south,
        };
        Ok(slot.queue.pop_front())
    }

    /// Send a payload to the north peer.
    pub fn send_north(&mut self, payload: &[u8]) -> RelayResult<()> {
        self.send(Direction::North, payload)
    }

    /// Send a payload to the south peer.
    pub fn send_south(&mut self, payload: &[u8]) -> RelayResult<()> {
        self.send(Direction::South, payload)
    }

    /// Send a payload to the peer in `dir`.
    ///
    /// An exhausted OS send buffer surfaces as the retryable
    /// [`RelayError::SendBufferFull`]; anything short of the full payload
    /// leaving the socket is a send failure.
    pub fn send(&mut self, dir: Direction, payload: &[u8]) -> RelayResult<()> {
        let Some(socket) = &self.socket else {
            return Err(RelayError::NotRunning);
        };
        let dest = match dir {
            Direction::North => self.north.dest(),
            Direction::South => self.south.dest(),
        };

        match socket.send_to(payload, dest) {
            Ok(sent) if sent == payload.len() => {
                self.stats.record_send(dir, sent);
                tracing::trace!(dir = %dir, %dest, len = sent, "datagram sent");
                Ok(())
            }
            Ok(sent) => {
                self.stats.record_send_error();
                Err(RelayError::Send(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short send: {sent} of {} bytes", payload.len()),
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(RelayError::SendBufferFull),
            Err(e) => {
                self.stats.record_send_error();
                Err(RelayError::Send(e))
            }
        }
    }
}
