//! Screen relay role handshake.
//!
//! ```text
//! Client ──[SENDER\n | RECEIVER\n]────────────► Server
//! Sender ──[len u64 BE][payload]──────────────► Server   (repeated)
//! Server ──[len u64 BE][payload]──────────────► every receiver
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::BeamError;

/// Which state machine governs a screen connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Pushes frames; never registered.
    Sender,
    /// Pure sink; registered in the receiver set.
    Receiver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sender => "SENDER",
            Role::Receiver => "RECEIVER",
        }
    }
}

impl FromStr for Role {
    type Err = BeamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SENDER" => Ok(Role::Sender),
            "RECEIVER" => Ok(Role::Receiver),
            _ => Err(BeamError::Protocol("unrecognized role".to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_tokens() {
        assert_eq!("SENDER".parse::<Role>().unwrap(), Role::Sender);
        assert_eq!("RECEIVER".parse::<Role>().unwrap(), Role::Receiver);
        assert_eq!(Role::Receiver.to_string(), "RECEIVER");
    }

    #[test]
    fn rejects_anything_else() {
        for token in ["sender", "", "RECEIVERS", "VIEWER"] {
            assert!(matches!(
                token.parse::<Role>(),
                Err(BeamError::Protocol(_))
            ));
        }
    }
}
