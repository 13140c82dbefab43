use std::collections::BTreeMap;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::BeamError;
use crate::network::{PeerHandle, PeerId};

/// A registered chat participant.
#[derive(Debug, Clone)]
pub struct ChatSession {
    name: String,
    handle: PeerHandle<String>,
    joined_at: Instant,
}

impl ChatSession {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> PeerId {
        self.handle.id()
    }

    pub fn handle(&self) -> &PeerHandle<String> {
        &self.handle
    }

    pub fn joined_at(&self) -> Instant {
        self.joined_at
    }
}

/// Name-keyed registry of chat sessions.
///
/// Names are unique: a second `add` with a registered name is rejected
/// with [`BeamError::NameTaken`] instead of replacing the first session.
#[derive(Debug, Default)]
pub struct ChatRegistry {
    sessions: Mutex<BTreeMap<String, ChatSession>>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(
        &self,
        name: impl Into<String>,
        handle: PeerHandle<String>,
    ) -> Result<ChatSession, BeamError> {
        let name = name.into();
        let mut sessions = self.sessions.lock().await;

        if sessions.contains_key(&name) {
            return Err(BeamError::NameTaken(name));
        }

        let session = ChatSession {
            name: name.clone(),
            handle,
            joined_at: Instant::now(),
        };
        sessions.insert(name, session.clone());
        Ok(session)
    }

    /// Remove whatever session holds `name`. Removing an absent name is
    /// a no-op.
    pub async fn remove(&self, name: &str) -> Option<ChatSession> {
        self.sessions.lock().await.remove(name)
    }

    /// Remove `session` only if it is still the registered holder of its
    /// name. Returns `true` if this call removed it.
    pub async fn remove_session(&self, session: &ChatSession) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(session.name()) {
            Some(current) if current.id() == session.id() => {
                sessions.remove(session.name());
                true
            }
            _ => false,
        }
    }

    /// Copy of every session except `name`, ordered by name.
    pub async fn snapshot_excluding(&self, name: &str) -> Vec<ChatSession> {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|s| s.name() != name)
            .cloned()
            .collect()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.sessions.lock().await.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Deliver `line` to every session except `sender`.
    ///
    /// Deliveries run concurrently, each bounded by the peer's write
    /// timeout. Sessions whose delivery fails are removed and their
    /// connections closed. Returns how many peers accepted the line.
    pub async fn broadcast_excluding(&self, sender: &str, line: &str) -> usize {
        let peers = self.snapshot_excluding(sender).await;
        let results = join_all(
            peers
                .iter()
                .map(|peer| peer.handle().deliver(line.to_string())),
        )
        .await;

        let mut delivered = 0;
        for (peer, result) in peers.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(_) => {
                    if self.remove_session(peer).await {
                        debug!(name = peer.name(), peer = peer.id(), "dropped unreachable chat peer");
                    }
                }
            }
        }
        delivered
    }
}
