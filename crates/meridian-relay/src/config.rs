//! Relay configuration.

use crate::error::{RelayError, RelayResult};

/// Relay configuration
///
/// Supplied once before `start` and read-only thereafter. Parsing from a
/// file or the command line lives in the caller, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Port the rendezvous socket binds to (0 = ephemeral)
    pub relay_port: u16,
    /// Source port identifying the north peer
    pub north_port: u16,
    /// Source port identifying the south peer
    pub south_port: u16,
    /// OS socket buffer size in bytes, applied to both the receive and
    /// send buffers (0 = leave the OS default)
    pub socket_buf_size: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relay_port: 0,
            north_port: 9696,
            south_port: 6969,
            socket_buf_size: 0,
        }
    }
}

impl RelayConfig {
    /// Validate the configuration.
    ///
    /// Peer ports must be non-zero and distinct from each other: the relay
    /// tells north from south by the source port of arriving datagrams.
    pub fn validate(&self) -> RelayResult<()> {
        if self.north_port == 0 {
            return Err(RelayError::InvalidConfig(
                "north port must be non-zero".into(),
            ));
        }
        if self.south_port == 0 {
            return Err(RelayError::InvalidConfig(
                "south port must be non-zero".into(),
            ));
        }
        if self.north_port == self.south_port {
            return Err(RelayError::InvalidConfig(format!(
                "north and south ports must differ, both are {}",
                self.north_port
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        RelayConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_peer_port_rejected() {
        let config = RelayConfig {
            north_port: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RelayError::InvalidConfig(_))
        ));

        let config = RelayConfig {
            south_port: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn equal_peer_ports_rejected() {
        let config = RelayConfig {
            north_port: 7000,
            south_port: 7000,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn ephemeral_relay_port_allowed() {
        let config = RelayConfig {
            relay_port: 0,
            ..Default::default()
        };
        config.validate().unwrap();
    }
}
