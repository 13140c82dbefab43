//! Synchronized peer registries.
//!
//! Both registries are the only shared mutable state in the relay.
//! Every read used for a broadcast is a point-in-time copy, so fan-out
//! never iterates a structure that other connections are mutating, and
//! the lock is never held across a delivery.

pub mod chat;
pub mod receiver;

pub use chat::{ChatRegistry, ChatSession};
pub use receiver::ReceiverRegistry;
