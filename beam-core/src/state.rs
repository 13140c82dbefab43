//! Per-connection state machine shared by the chat and screen relays.
//!
//! ```text
//!                   ┌──► Chatting  ──┐
//!  Handshaking ─────┼──► Sending   ──┼──► Closed
//!        │          └──► Receiving ──┘      ▲
//!        └──────────────────────────────────┘
//! ```
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::BeamError;
use crate::protocol::Role;

/// The current phase of one relay connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Waiting for the name or role line.
    #[default]
    Handshaking,

    /// Registered chat session relaying messages.
    Chatting { since: Instant },

    /// Screen sender pushing frames.
    Sending { since: Instant },

    /// Registered screen receiver.
    Receiving { since: Instant },

    /// Terminal state.
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshaking => write!(f, "Handshaking"),
            Self::Chatting { .. } => write!(f, "Chatting"),
            Self::Sending { .. } => write!(f, "Sending"),
            Self::Receiving { .. } => write!(f, "Receiving"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl SessionPhase {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// How long the connection has been past its handshake.
    pub fn active_duration(&self) -> Option<Duration> {
        match self {
            Self::Chatting { since } | Self::Sending { since } | Self::Receiving { since } => {
                Some(since.elapsed())
            }
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Handshaking`.
    pub fn join_chat(&mut self) -> Result<(), BeamError> {
        self.leave_handshake(Self::Chatting {
            since: Instant::now(),
        })
    }

    /// Valid from: `Handshaking`.
    pub fn assume_role(&mut self, role: Role) -> Result<(), BeamError> {
        let since = Instant::now();
        self.leave_handshake(match role {
            Role::Sender => Self::Sending { since },
            Role::Receiver => Self::Receiving { since },
        })
    }

    /// Valid from any state but `Closed`.
    pub fn close(&mut self) -> Result<(), BeamError> {
        if self.is_closed() {
            return Err(BeamError::Protocol("session already closed".to_string()));
        }
        *self = Self::Closed;
        Ok(())
    }

    fn leave_handshake(&mut self, next: Self) -> Result<(), BeamError> {
        match self {
            Self::Handshaking => {
                *self = next;
                Ok(())
            }
            other => Err(BeamError::Protocol(format!(
                "cannot enter {next}: session is {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_lifecycle() {
        let mut phase = SessionPhase::default();
        assert!(phase.active_duration().is_none());
        phase.join_chat().unwrap();
        assert!(phase.active_duration().is_some());
        phase.close().unwrap();
        assert!(phase.is_closed());
    }

    #[test]
    fn roles_map_to_phases() {
        let mut phase = SessionPhase::default();
        phase.assume_role(Role::Receiver).unwrap();
        assert!(matches!(phase, SessionPhase::Receiving { .. }));

        let mut phase = SessionPhase::default();
        phase.assume_role(Role::Sender).unwrap();
        assert_eq!(phase.to_string(), "Sending");
    }

    #[test]
    fn handshake_only_once() {
        let mut phase = SessionPhase::default();
        phase.join_chat().unwrap();
        assert!(phase.assume_role(Role::Sender).is_err());
        assert!(phase.join_chat().is_err());
    }

    #[test]
    fn close_from_handshake_but_not_twice() {
        let mut phase = SessionPhase::default();
        phase.close().unwrap();
        assert!(phase.close().is_err());
        assert!(phase.join_chat().is_err());
    }
}
