//! Configuration for the relay server.

use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use beam_core::{BeamError, PeerConfig, RelayConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener settings.
    pub network: NetworkConfig,
    /// Size limits and timeouts.
    pub limits: LimitsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host both listeners bind to.
    pub host: String,
    /// TCP port of the chat relay.
    pub chat_port: u16,
    /// TCP port of the screen relay.
    pub screen_port: u16,
    /// Maximum concurrent connections across both relays.
    pub max_connections: usize,
}

/// Protocol limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest screen frame payload, in bytes.
    pub max_frame_size: usize,
    /// Longest chat line, in bytes.
    pub max_line_length: usize,
    /// Deadline for the name / role line.
    pub handshake_timeout_ms: u64,
    /// Deadline for a single write to a peer.
    pub write_timeout_ms: u64,
    /// Items queued per peer before it counts as slow.
    pub peer_queue_depth: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive, used when `RUST_LOG` is unset.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        let relay = RelayConfig::default();
        Self {
            host: relay.host,
            chat_port: relay.chat_port,
            screen_port: relay.screen_port,
            max_connections: relay.max_connections,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let relay = RelayConfig::default();
        Self {
            max_frame_size: relay.max_frame_size,
            max_line_length: relay.max_line_length,
            handshake_timeout_ms: millis(relay.handshake_timeout),
            write_timeout_ms: millis(relay.peer.write_timeout),
            peer_queue_depth: relay.peer.queue_depth,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Loading ──────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; an unreadable or malformed one
    /// is an error.
    pub fn load(path: &Path) -> Result<Self, BeamError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents)
                .map_err(|e| BeamError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(BeamError::Config(format!("{}: {e}", path.display()))),
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// The default configuration as TOML.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }

    /// Convert into the core relay settings.
    pub fn to_relay_config(&self) -> RelayConfig {
        RelayConfig {
            host: self.network.host.clone(),
            chat_port: self.network.chat_port,
            screen_port: self.network.screen_port,
            max_connections: self.network.max_connections,
            max_frame_size: self.limits.max_frame_size,
            max_line_length: self.limits.max_line_length,
            handshake_timeout: Duration::from_millis(self.limits.handshake_timeout_ms),
            peer: PeerConfig {
                queue_depth: self.limits.peer_queue_depth,
                write_timeout: Duration::from_millis(self.limits.write_timeout_ms),
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
