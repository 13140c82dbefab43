use std::collections::HashMap;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::debug;

use crate::frame::Frame;
use crate::network::{PeerHandle, PeerId};

/// Unordered set of screen receivers, keyed by peer id.
#[derive(Debug, Default)]
pub struct ReceiverRegistry {
    receivers: Mutex<HashMap<PeerId, PeerHandle<Frame>>>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, handle: PeerHandle<Frame>) -> PeerId {
        let id = handle.id();
        self.receivers.lock().await.insert(id, handle);
        id
    }

    /// Returns `true` if `id` was registered. Removing twice is a no-op.
    pub async fn remove(&self, id: PeerId) -> bool {
        self.receivers.lock().await.remove(&id).is_some()
    }

    pub async fn snapshot(&self) -> Vec<PeerHandle<Frame>> {
        self.receivers.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.receivers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.receivers.lock().await.is_empty()
    }

    /// Fan `frame` out to every registered receiver.
    ///
    /// Each delivery is independent and bounded by that receiver's write
    /// timeout; a receiver that fails is removed and closed while the
    /// rest still get the frame. Returns how many receivers accepted it.
    pub async fn broadcast(&self, frame: &Frame) -> usize {
        let receivers = self.snapshot().await;
        if receivers.is_empty() {
            return 0;
        }

        let results = join_all(receivers.iter().map(|r| r.deliver(frame.clone()))).await;

        let mut delivered = 0;
        for (receiver, result) in receivers.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(_) => {
                    if self.remove(receiver.id()).await {
                        debug!(peer = receiver.id(), "dropped unreachable screen receiver");
                    }
                }
            }
        }
        delivered
    }
}
