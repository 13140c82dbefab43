pub mod peer;

pub use peer::{PeerConfig, PeerHandle, PeerId, spawn_writer};
