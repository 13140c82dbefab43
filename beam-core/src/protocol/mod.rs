//! Wire-level vocabulary shared by the relay loops and the clients.
//!
//! | Module   | Purpose                                           |
//! |----------|---------------------------------------------------|
//! | `chat`   | Name validation and announcement / message lines  |
//! | `screen` | The `SENDER` / `RECEIVER` role handshake token    |

pub mod chat;
pub mod screen;

pub use chat::{MAX_NAME_LENGTH, format_join, format_leave, format_message, validate_name};
pub use screen::Role;

/// Prefix of the diagnostic line sent before the server closes a
/// connection for a protocol violation.
pub const DIAGNOSTIC_PREFIX: &str = "! ";

/// Render a diagnostic line for the client.
pub fn format_diagnostic(message: &str) -> String {
    format!("{DIAGNOSTIC_PREFIX}{message}")
}
