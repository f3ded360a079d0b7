//! The relay's rendezvous socket.
//!
//! One owned OS UDP socket, created through socket2 so the buffer sizes can
//! be set before binding, then converted to a `std::net::UdpSocket` for I/O.
//! The handle is either unbound (not yet constructed) or bound with
//! non-blocking mode enabled; there is no in-between state observable from
//! outside.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};

/// Exclusively owned, bound, non-blocking UDP socket
///
/// Dropping the handle releases the descriptor. Failures during
/// construction drop the partially configured socket before the error is
/// returned, so no descriptor outlives a failed `bind`.
#[derive(Debug)]
pub struct RelaySocket {
    socket: UdpSocket,
    recv_buffer_size: usize,
    send_buffer_size: usize,
}

impl RelaySocket {
    /// Create, configure and bind the rendezvous socket.
    ///
    /// The three stages map onto the relay's error kinds: socket creation
    /// (`CannotCreateSocket`), non-blocking mode plus optional buffer
    /// sizing (`CannotConfigureSocket`), and the wildcard-address bind
    /// (`CannotBindSocket`).
    pub fn bind(config: &RelayConfig) -> RelayResult<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(RelayError::CannotCreateSocket)?;

        socket
            .set_nonblocking(true)
            .map_err(RelayError::CannotConfigureSocket)?;

        // 0 leaves the OS defaults in place. The kernel may clamp or round
        // whatever we ask for, so the actual sizes are read back below.
        if config.socket_buf_size > 0 {
            socket
                .set_recv_buffer_size(config.socket_buf_size as usize)
                .map_err(RelayError::CannotConfigureSocket)?;
            socket
                .set_send_buffer_size(config.socket_buf_size as usize)
                .map_err(RelayError::CannotConfigureSocket)?;
        }

        let recv_buffer_size = socket
            .recv_buffer_size()
            .map_err(RelayError::CannotConfigureSocket)?;
        let send_buffer_size = socket
            .send_buffer_size()
            .map_err(RelayError::CannotConfigureSocket)?;

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.relay_port));
        socket
            .bind(&addr.into())
            .map_err(|source| RelayError::CannotBindSocket {
                port: config.relay_port,
                source,
            })?;

        let socket: UdpSocket = socket.into();
        tracing::debug!(
            port = config.relay_port,
            recv_buffer_size,
            send_buffer_size,
            "rendezvous socket bound"
        );

        Ok(Self {
            socket,
            recv_buffer_size,
            send_buffer_size,
        })
    }

    /// Non-blocking receive of one datagram.
    ///
    /// Returns `WouldBlock` when the OS has nothing queued; the caller maps
    /// that to its benign "no data" outcome.
    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf)
    }

    /// Non-blocking send of one datagram to `addr`.
    pub fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    /// The address the socket is actually bound to.
    ///
    /// Useful when the configured relay port was 0 and the OS picked one.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// OS receive buffer size actually in effect
    pub fn recv_buffer_size(&self) -> usize {
        self.recv_buffer_size
    }

    /// OS send buffer size actually in effect
    pub fn send_buffer_size(&self) -> usize {
        self.send_buffer_size
    }
}
