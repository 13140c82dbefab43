//! Runtime settings for [`RelayServer`](crate::server::RelayServer).

use std::time::Duration;

use crate::codec::DEFAULT_MAX_LINE_LENGTH;
use crate::error::BeamError;
use crate::frame::DEFAULT_MAX_FRAME_SIZE;
use crate::network::PeerConfig;

/// Configuration for [`RelayServer`](crate::server::RelayServer).
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Host both listeners bind to.
    pub host: String,
    /// Chat listener port (0 = OS-assigned).
    pub chat_port: u16,
    /// Screen listener port (0 = OS-assigned).
    pub screen_port: u16,
    /// Concurrent connections accepted across both listeners.
    pub max_connections: usize,
    /// Largest screen frame payload accepted or relayed.
    pub max_frame_size: usize,
    /// Longest chat line accepted, in bytes.
    pub max_line_length: usize,
    /// Deadline for the name / role line after connecting.
    pub handshake_timeout: Duration,
    /// Per-peer queue and write timeout.
    pub peer: PeerConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            chat_port: 9999,
            screen_port: 9998,
            max_connections: 256,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            handshake_timeout: Duration::from_secs(10),
            peer: PeerConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<(), BeamError> {
        if self.host.trim().is_empty() {
            return Err(BeamError::Config("host must not be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(BeamError::Config("max_connections must be at least 1".into()));
        }
        if self.max_line_length == 0 || self.max_frame_size == 0 {
            return Err(BeamError::Config("size limits must be non-zero".into()));
        }
        if self.peer.queue_depth == 0 {
            return Err(BeamError::Config("peer queue depth must be at least 1".into()));
        }
        if self.peer.write_timeout.is_zero() || self.handshake_timeout.is_zero() {
            return Err(BeamError::Config("timeouts must be non-zero".into()));
        }
        if self.chat_port != 0 && self.chat_port == self.screen_port {
            return Err(BeamError::Config(
                "chat and screen ports must differ".into(),
            ));
        }
        Ok(())
    }

    /// `host:chat_port`.
    pub fn chat_bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.chat_port)
    }

    /// `host:screen_port`.
    pub fn screen_bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.screen_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wire_defaults() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.chat_bind_addr(), "localhost:9999");
        assert_eq!(cfg.screen_bind_addr(), "localhost:9998");
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_shared_port() {
        let cfg = RelayConfig {
            chat_port: 7000,
            screen_port: 7000,
            ..RelayConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(BeamError::Config(_))));
    }

    #[test]
    fn ephemeral_ports_may_coincide() {
        let cfg = RelayConfig {
            chat_port: 0,
            screen_port: 0,
            ..RelayConfig::default()
        };
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_zero_limits() {
        let mut cfg = RelayConfig::default();
        cfg.max_connections = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RelayConfig::default();
        cfg.peer.write_timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }
}
