//! Listener and dispatch.
//!
//! [`RelayServer`] owns both listeners. Every accepted socket gets its own
//! task on a [`TaskTracker`] and a child of the server's cancellation
//! token, so shutting the server down reaches every live connection.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::RelayConfig;
use crate::error::BeamError;
use crate::relay::{RelayContext, serve_chat, serve_screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    Chat,
    Screen,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Service::Chat => "chat",
            Service::Screen => "screen",
        })
    }
}

// ── RelayServer ──────────────────────────────────────────────────

/// The chat and screen relay.
///
/// ```no_run
/// # async fn demo() -> Result<(), beam_core::BeamError> {
/// use beam_core::{RelayConfig, RelayServer};
///
/// let server = RelayServer::bind(RelayConfig::default()).await?;
/// server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
/// # }
/// ```
#[derive(Debug)]
pub struct RelayServer {
    chat: TcpListener,
    screen: TcpListener,
    ctx: Arc<RelayContext>,
    limit: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl RelayServer {
    /// Validate `config` and bind both listeners.
    pub async fn bind(config: RelayConfig) -> Result<Self, BeamError> {
        config.validate()?;

        let chat = TcpListener::bind(config.chat_bind_addr())
            .await
            .map_err(BeamError::Listener)?;
        let screen = TcpListener::bind(config.screen_bind_addr())
            .await
            .map_err(BeamError::Listener)?;

        info!(
            chat = %chat.local_addr().map_err(BeamError::Listener)?,
            screen = %screen.local_addr().map_err(BeamError::Listener)?,
            max_connections = config.max_connections,
            "relay listening"
        );

        Ok(Self {
            chat,
            screen,
            limit: Arc::new(Semaphore::new(config.max_connections)),
            ctx: Arc::new(RelayContext::new(config)),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn chat_addr(&self) -> io::Result<SocketAddr> {
        self.chat.local_addr()
    }

    pub fn screen_addr(&self) -> io::Result<SocketAddr> {
        self.screen.local_addr()
    }

    /// Shared registries, for inspection while the server runs.
    pub fn context(&self) -> Arc<RelayContext> {
        Arc::clone(&self.ctx)
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Serve both listeners until `shutdown` resolves, the shutdown
    /// handle is cancelled, or a listener fails.
    ///
    /// Live connections are cancelled and awaited before this returns.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), BeamError>
    where
        F: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            _ = shutdown => {
                info!("shutdown requested");
                Ok(())
            }
            result = futures::future::try_join(
                self.accept_loop(Service::Chat, &self.chat),
                self.accept_loop(Service::Screen, &self.screen),
            ) => result.map(|_| ()),
        };

        self.cancel.cancel();
        self.tracker.close();
        debug!(live = self.tracker.len(), "waiting for connections");
        self.tracker.wait().await;
        info!("relay stopped");
        outcome
    }

    async fn accept_loop(&self, service: Service, listener: &TcpListener) -> Result<(), BeamError> {
        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                accepted = listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) if is_transient(&e) => {
                    warn!(%service, error = %e, "accept failed; continuing");
                    continue;
                }
                Err(e) => {
                    error!(%service, error = %e, "listener failed; shutting down");
                    self.cancel.cancel();
                    return Err(BeamError::Listener(e));
                }
            };

            let Ok(permit) = Arc::clone(&self.limit).try_acquire_owned() else {
                warn!(%service, %peer, "connection limit reached; refusing");
                drop(stream);
                continue;
            };

            let ctx = Arc::clone(&self.ctx);
            let cancel = self.cancel.child_token();
            let span = info_span!("conn", %service, %peer);
            self.tracker.spawn(
                async move {
                    let _permit = permit;
                    debug!("accepted");
                    log_outcome(serve(service, stream, ctx, cancel).await);
                }
                .instrument(span),
            );
        }
    }
}

async fn serve(
    service: Service,
    stream: TcpStream,
    ctx: Arc<RelayContext>,
    cancel: CancellationToken,
) -> Result<(), BeamError> {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "could not set TCP_NODELAY");
    }
    match service {
        Service::Chat => serve_chat(stream, ctx, cancel).await,
        Service::Screen => serve_screen(stream, ctx, cancel).await,
    }
}

fn log_outcome(outcome: Result<(), BeamError>) {
    match outcome {
        Ok(()) => debug!("connection closed"),
        Err(e) if e.is_disconnect() => debug!(error = %e, "connection lost"),
        Err(e) if e.diagnostic().is_some() => warn!(error = %e, "protocol violation"),
        Err(e) => warn!(error = %e, "connection failed"),
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const WAIT: Duration = Duration::from_secs(5);

    fn local_config() -> RelayConfig {
        RelayConfig {
            host: "127.0.0.1".into(),
            chat_port: 0,
            screen_port: 0,
            ..RelayConfig::default()
        }
    }

    #[tokio::test]
    async fn binds_ephemeral_ports() {
        let server = RelayServer::bind(local_config()).await.unwrap();
        let chat = server.chat_addr().unwrap();
        let screen = server.screen_addr().unwrap();
        assert_ne!(chat.port(), 0);
        assert_ne!(screen.port(), 0);
        assert_ne!(chat, screen);
    }

    #[tokio::test]
    async fn bind_rejects_invalid_config() {
        let config = RelayConfig {
            max_connections: 0,
            ..local_config()
        };
        assert!(matches!(
            RelayServer::bind(config).await,
            Err(BeamError::Config(_))
        ));
    }

    #[tokio::test]
    async fn shutdown_handle_stops_server() {
        let server = RelayServer::bind(local_config()).await.unwrap();
        let stop = server.shutdown_handle();
        let task = tokio::spawn(server.run_until(std::future::pending()));

        stop.cancel();
        let result = tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn shutdown_closes_live_connections() {
        let server = RelayServer::bind(local_config()).await.unwrap();
        let addr = server.chat_addr().unwrap();
        let ctx = server.context();
        let stop = server.shutdown_handle();
        let task = tokio::spawn(server.run_until(std::future::pending()));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"alice\n").await.unwrap();
        tokio::time::timeout(WAIT, async {
            while !ctx.chat.contains("alice").await {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        stop.cancel();
        tokio::time::timeout(WAIT, task).await.unwrap().unwrap().unwrap();

        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(WAIT, client.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
        assert!(ctx.chat.is_empty().await);
    }

    #[tokio::test]
    async fn connections_over_limit_are_refused() {
        let config = RelayConfig {
            max_connections: 1,
            ..local_config()
        };
        let server = RelayServer::bind(config).await.unwrap();
        let addr = server.chat_addr().unwrap();
        let ctx = server.context();
        let stop = server.shutdown_handle();
        tokio::spawn(server.run_until(std::future::pending()));

        let mut first = TcpStream::connect(addr).await.unwrap();
        first.write_all(b"alice\n").await.unwrap();
        tokio::time::timeout(WAIT, async {
            while !ctx.chat.contains("alice").await {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(WAIT, second.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
        assert_eq!(ctx.chat.len().await, 1);

        stop.cancel();
    }
}
