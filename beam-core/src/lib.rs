//! # beam-core
//!
//! Core library for the beam chat and screen relay.
//!
//! This crate contains:
//! - **Frame**: `Frame`, one length-prefixed binary unit of the screen protocol
//! - **Codec**: `FrameCodec` and `LineCodec` for framed TCP I/O via `tokio_util`
//! - **Protocol**: chat line formats, name validation, the screen `Role` handshake
//! - **Network**: per-peer writer tasks fed through bounded queues (`PeerHandle`)
//! - **Registry**: `ChatRegistry` and `ReceiverRegistry` with snapshot broadcasts
//! - **Relay**: the chat and screen per-connection loops
//! - **Server**: `RelayServer`, both accept loops and shutdown
//! - **Client**: `ChatClient`, `ScreenSender`, `ScreenReceiver`
//! - **Error**: `BeamError`, a typed `thiserror`-based error enum

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod network;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::{ChatClient, ChatReader, ChatWriter, ScreenReceiver, ScreenSender};
pub use codec::{FrameCodec, LineCodec};
pub use config::RelayConfig;
pub use error::BeamError;
pub use frame::{DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_SIZE, Frame};
pub use network::{PeerConfig, PeerHandle, PeerId};
pub use protocol::Role;
pub use registry::{ChatRegistry, ChatSession, ReceiverRegistry};
pub use relay::{RelayContext, serve_chat, serve_screen};
pub use server::RelayServer;
pub use state::SessionPhase;
