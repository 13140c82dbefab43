//! `tokio_util` codecs for the two wire protocols.
//!
//! - [`FrameCodec`]: u64 big-endian length prefix + opaque payload
//!   (screen relay).
//! - [`LineCodec`]: newline-delimited UTF-8 text (chat relay and the
//!   screen role handshake).

pub mod frame;
pub mod line;

pub use frame::FrameCodec;
pub use line::{DEFAULT_MAX_LINE_LENGTH, LineCodec};
