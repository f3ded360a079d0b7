//! Shared helpers for Meridian integration tests.
//!
//! Peers bind ephemeral loopback sockets and the relay is configured with
//! whatever ports the OS handed out, so parallel tests never fight over
//! fixed port numbers.

use meridian_relay::{Direction, Relay, RelayConfig};
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

/// A test endpoint standing in for the north or south peer.
pub struct TestPeer {
    socket: UdpSocket,
}

impl TestPeer {
    /// Bind a peer on an ephemeral loopback port with a 1s read timeout.
    pub fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind test peer");
        socket
            .set_read_timeout(Some(Duration::from_secs(1)))
            .expect("set read timeout");
        Self { socket }
    }

    /// The port the relay should classify this peer by.
    pub fn port(&self) -> u16 {
        self.socket.local_addr().expect("peer local addr").port()
    }

    /// Send a payload to the relay.
    pub fn send(&self, relay_addr: SocketAddr, payload: &[u8]) {
        let sent = self.socket.send_to(payload, relay_addr).expect("peer send");
        assert_eq!(sent, payload.len(), "peer sent a partial datagram");
    }

    /// Receive one datagram, panicking after the read timeout.
    pub fn recv(&self) -> Vec<u8> {
        let mut buf = [0u8; 65536];
        let (len, _) = self.socket.recv_from(&mut buf).expect("peer recv");
        buf[..len].to_vec()
    }

    /// Receive one datagram unless the read timeout expires.
    pub fn try_recv(&self) -> Option<Vec<u8>> {
        let mut buf = [0u8; 65536];
        match self.socket.recv_from(&mut buf) {
            Ok((len, _)) => Some(buf[..len].to_vec()),
            Err(_) => None,
        }
    }
}

/// Build and start a relay pairing the two peers, on an ephemeral port.
pub fn relay_between(north: &TestPeer, south: &TestPeer) -> Relay {
    let mut relay = Relay::new(RelayConfig {
        relay_port: 0,
        north_port: north.port(),
        south_port: south.port(),
        socket_buf_size: 0,
    })
    .expect("relay config");
    relay.start().expect("relay start");
    relay
}

/// The loopback address peers should send to.
pub fn relay_dest(relay: &Relay) -> SocketAddr {
    let port = relay.local_addr().expect("relay local addr").port();
    format!("127.0.0.1:{port}").parse().expect("relay dest")
}

/// Poll the relay for a datagram in `dir` until `deadline` elapses.
pub fn recv_with_deadline(relay: &mut Relay, dir: Direction, deadline: Duration) -> Option<Vec<u8>> {
    let start = Instant::now();
    loop {
        if let Some(payload) = relay.recv(dir).expect("relay recv") {
            return Some(payload);
        }
        if start.elapsed() > deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}
