//! Chat protocol lines.
//!
//! ```text
//! Client ──[<name>\n]─────────────────────────► Server   (handshake)
//! Server ──[🟢 <name> joined the chat\n]──────► others
//! Client ──[<message>\n]──────────────────────► Server
//! Server ──[[HH:MM:SS] <name>: <message>\n]───► others
//! Server ──[🔴 <name> left the chat\n]────────► others   (on close)
//! ```

use chrono::{DateTime, Local};

use crate::error::BeamError;

/// Longest accepted display name, in characters.
pub const MAX_NAME_LENGTH: usize = 32;

/// Trim and check a requested display name.
pub fn validate_name(raw: &str) -> Result<String, BeamError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(BeamError::Protocol("name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(BeamError::Protocol(format!(
            "name longer than {MAX_NAME_LENGTH} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(BeamError::Protocol(
            "name contains control characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

pub fn format_join(name: &str) -> String {
    format!("🟢 {name} joined the chat")
}

pub fn format_leave(name: &str) -> String {
    format!("🔴 {name} left the chat")
}

/// `[HH:MM:SS] <name>: <message>` using the given wall-clock time.
pub fn format_message(at: DateTime<Local>, name: &str, message: &str) -> String {
    format!("[{}] {name}: {message}", at.format("%H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn names_are_trimmed() {
        assert_eq!(validate_name("  alice \t").unwrap(), "alice");
    }

    #[test]
    fn rejects_bad_names() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
        assert!(validate_name("al\u{7}ice").is_err());
        assert!(validate_name(&"é".repeat(MAX_NAME_LENGTH)).is_ok());
    }

    #[test]
    fn message_layout() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(format_message(at, "alice", "hi"), "[09:05:07] alice: hi");
    }

    #[test]
    fn announcements() {
        assert_eq!(format_join("bob"), "🟢 bob joined the chat");
        assert_eq!(format_leave("bob"), "🔴 bob left the chat");
    }
}
