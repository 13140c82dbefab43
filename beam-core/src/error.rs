//! Domain-specific error types for the beam relay.
//!
//! Every fallible operation in the core returns `Result<T, BeamError>`.
//! Most variants are recovered locally by the connection that raised
//! them; only [`BeamError::Listener`] is fatal to the server.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the beam relay.
#[derive(Debug, Error)]
pub enum BeamError {
    // ── Connection Errors ────────────────────────────────────────
    /// The peer ended the stream, possibly in the middle of a frame.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Delivering to a peer failed; the peer is treated as gone.
    #[error("write to peer failed")]
    WriteFailure,

    /// A listening socket could not be bound or stopped accepting.
    #[error("listener failure: {0}")]
    Listener(std::io::Error),

    /// The TCP/IO layer reported an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Protocol Errors ──────────────────────────────────────────
    /// A handshake or message violated the wire protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Another chat session already holds this name.
    #[error("name '{0}' is already in use")]
    NameTaken(String),

    /// A frame declared a payload larger than the configured limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u64, max: usize },

    /// A text line exceeded the configured limit.
    #[error("line exceeds {max} bytes")]
    LineTooLong { max: usize },

    // ── Configuration ────────────────────────────────────────────
    /// The relay configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BeamError {
    /// `true` for errors that simply mean the peer went away.
    ///
    /// These end a relay loop quietly rather than being logged as
    /// failures.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::ConnectionClosed | Self::WriteFailure | Self::ChannelClosed => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    /// Short diagnostic suitable for sending to the client before
    /// closing, if this error is the client's fault.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Self::Protocol(msg) => Some(msg.clone()),
            Self::NameTaken(_) | Self::FrameTooLarge { .. } | Self::LineTooLong { .. } => {
                Some(self.to_string())
            }
            Self::Timeout(_) => Some("handshake timed out".to_string()),
            _ => None,
        }
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for BeamError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        BeamError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = BeamError::FrameTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e = BeamError::NameTaken("alice".into());
        assert_eq!(e.to_string(), "name 'alice' is already in use");
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: BeamError = io_err.into();
        assert!(matches!(e, BeamError::Io(_)));
        assert!(e.is_disconnect());
    }

    #[test]
    fn protocol_errors_carry_diagnostics() {
        assert!(BeamError::Protocol("bad role".into()).diagnostic().is_some());
        assert!(BeamError::ConnectionClosed.diagnostic().is_none());
        assert!(!BeamError::Protocol("x".into()).is_disconnect());
    }
}
