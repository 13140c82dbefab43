//! Outbound writer handles.
//!
//! Each registered peer gets one background writer task that owns the
//! sink half of its socket. Broadcasters never touch the socket; they
//! push into the peer's bounded queue through a [`PeerHandle`]. A single
//! writer per connection keeps every frame or line whole on the wire,
//! and the queue preserves the order items were produced in.
//!
//! A peer is considered gone when any of these happen:
//! - its queue stays full for longer than the write timeout,
//! - a socket write fails or exceeds the write timeout,
//! - its connection token is cancelled.
//!
//! In all three cases the token ends up cancelled, which also stops the
//! connection's relay loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::BeamError;

/// Identifier shared by a peer's registry entry and its log lines.
pub type PeerId = u64;

static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

fn next_peer_id() -> PeerId {
    NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed)
}

// ── PeerConfig ───────────────────────────────────────────────────

/// Tuning for per-peer writer tasks.
#[derive(Debug, Clone, Copy)]
pub struct PeerConfig {
    /// Items buffered per peer before deliveries start waiting.
    pub queue_depth: usize,
    /// Bound on both a queue push and a single socket write.
    pub write_timeout: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            write_timeout: Duration::from_secs(5),
        }
    }
}

// ── PeerHandle ───────────────────────────────────────────────────

/// Cloneable handle used to deliver items to one connected peer.
#[derive(Debug)]
pub struct PeerHandle<T> {
    id: PeerId,
    tx: mpsc::Sender<T>,
    cancel: CancellationToken,
    write_timeout: Duration,
}

impl<T> Clone for PeerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
            write_timeout: self.write_timeout,
        }
    }
}

impl<T: Send + 'static> PeerHandle<T> {
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Queue `item` for the peer.
    ///
    /// Fails with [`BeamError::WriteFailure`] when the peer is gone or
    /// its queue stays full past the write timeout. A failed delivery
    /// cancels the peer's connection.
    pub async fn deliver(&self, item: T) -> Result<(), BeamError> {
        if self.cancel.is_cancelled() {
            return Err(BeamError::WriteFailure);
        }

        match self.tx.send_timeout(item, self.write_timeout).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(peer = self.id, error = %e, "delivery failed; closing peer");
                self.cancel.cancel();
                Err(BeamError::WriteFailure)
            }
        }
    }

    /// Close the peer's connection.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}

// ── Writer task ──────────────────────────────────────────────────

/// Join handle of a running writer task.
#[derive(Debug)]
pub struct WriterTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl WriterTask {
    /// Wait up to `grace` for the task to drain its queue and exit, then
    /// force it closed.
    ///
    /// The queue only drains to completion once every [`PeerHandle`] for
    /// this peer has been dropped.
    pub async fn finish(mut self, grace: Duration) {
        if tokio::time::timeout(grace, &mut self.handle).await.is_err() {
            self.cancel.cancel();
            let _ = self.handle.await;
        }
    }
}

/// Spawn the writer task for `sink` and return the handle that feeds it.
///
/// The task runs until `cancel` fires, every handle is dropped, or a
/// write fails. It always cancels `cancel` on exit and then tries to
/// close the sink, which shuts down the write half of the socket.
pub fn spawn_writer<S, T>(
    sink: S,
    config: PeerConfig,
    cancel: CancellationToken,
) -> (PeerHandle<T>, WriterTask)
where
    S: Sink<T, Error = BeamError> + Unpin + Send + 'static,
    T: Send + 'static,
{
    let id = next_peer_id();
    let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
    let task = WriterTask {
        handle: tokio::spawn(write_loop(id, sink, rx, config.write_timeout, cancel.clone())),
        cancel: cancel.clone(),
    };

    let handle = PeerHandle {
        id,
        tx,
        cancel,
        write_timeout: config.write_timeout,
    };
    (handle, task)
}

async fn write_loop<S, T>(
    id: PeerId,
    mut sink: S,
    mut rx: mpsc::Receiver<T>,
    write_timeout: Duration,
    cancel: CancellationToken,
) where
    S: Sink<T, Error = BeamError> + Unpin,
{
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => break,
            item = rx.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        match tokio::time::timeout(write_timeout, sink.send(item)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(peer = id, error = %e, "peer write failed");
                break;
            }
            Err(_) => {
                debug!(peer = id, timeout = ?write_timeout, "peer write timed out");
                break;
            }
        }
    }

    cancel.cancel();
    let _ = tokio::time::timeout(write_timeout, sink.close()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as fmpsc;
    use futures::StreamExt;

    fn collecting_sink() -> (
        impl Sink<u32, Error = BeamError> + Unpin + Send + 'static,
        fmpsc::UnboundedReceiver<u32>,
    ) {
        let (tx, rx) = fmpsc::unbounded();
        (tx.sink_map_err(|_| BeamError::ChannelClosed), rx)
    }

    #[tokio::test]
    async fn delivers_in_order() {
        let (sink, mut out) = collecting_sink();
        let (peer, _task) = spawn_writer(sink, PeerConfig::default(), CancellationToken::new());

        for i in 0..10u32 {
            peer.deliver(i).await.unwrap();
        }

        for i in 0..10u32 {
            assert_eq!(out.next().await, Some(i));
        }
    }

    #[tokio::test]
    async fn close_stops_delivery() {
        let (sink, _out) = collecting_sink();
        let (peer, task) = spawn_writer(sink, PeerConfig::default(), CancellationToken::new());

        peer.close();
        task.finish(Duration::from_secs(1)).await;
        assert!(peer.is_closed());
        assert!(matches!(peer.deliver(1).await, Err(BeamError::WriteFailure)));
    }

    #[tokio::test]
    async fn finish_drains_queue_after_handles_drop() {
        let (sink, mut out) = collecting_sink();
        let (peer, task) = spawn_writer(sink, PeerConfig::default(), CancellationToken::new());

        peer.deliver(7).await.unwrap();
        peer.deliver(8).await.unwrap();
        drop(peer);
        task.finish(Duration::from_secs(1)).await;

        assert_eq!(out.next().await, Some(7));
        assert_eq!(out.next().await, Some(8));
        // Writer closed the sink on exit.
        assert_eq!(out.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_times_out_and_cancels() {
        // A sink that never becomes ready stalls the writer task.
        let sink = futures::sink::unfold((), |(), _item: u32| async {
            futures::future::pending::<Result<(), BeamError>>().await
        });
        let config = PeerConfig {
            queue_depth: 1,
            write_timeout: Duration::from_millis(50),
        };
        let cancel = CancellationToken::new();
        let (peer, _task) = spawn_writer(Box::pin(sink), config, cancel.clone());

        // First item is taken by the stalled writer, second fills the queue.
        peer.deliver(1).await.unwrap();
        tokio::task::yield_now().await;
        let _ = peer.deliver(2).await;
        let result = peer.deliver(3).await;

        assert!(matches!(result, Err(BeamError::WriteFailure)));
        assert!(cancel.is_cancelled());
    }
}
