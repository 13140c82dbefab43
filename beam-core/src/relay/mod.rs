//! Per-connection relay loops.
//!
//! | Module   | Purpose                                                 |
//! |----------|---------------------------------------------------------|
//! | `chat`   | Name handshake, line fan-out, join / leave announcements |
//! | `screen` | Role handshake, sender frame fan-out, receiver sinks    |
//!
//! Both loops are generic over the byte stream so they run the same way
//! on a `TcpStream` and on an in-memory duplex pipe.

pub mod chat;
pub mod screen;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::codec::LineCodec;
use crate::config::RelayConfig;
use crate::error::BeamError;
use crate::protocol::format_diagnostic;
use crate::registry::{ChatRegistry, ReceiverRegistry};

pub use chat::serve_chat;
pub use screen::serve_screen;

/// State shared by every relay loop of one server.
#[derive(Debug, Default)]
pub struct RelayContext {
    pub config: RelayConfig,
    pub chat: ChatRegistry,
    pub receivers: ReceiverRegistry,
}

impl RelayContext {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            chat: ChatRegistry::new(),
            receivers: ReceiverRegistry::new(),
        }
    }
}

/// Read the single handshake line.
///
/// Fails with [`BeamError::Timeout`] if nothing arrives in time and with
/// [`BeamError::ConnectionClosed`] if the peer leaves or the connection
/// is cancelled first.
pub(crate) async fn read_handshake<T>(
    framed: &mut Framed<T, LineCodec>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String, BeamError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(BeamError::ConnectionClosed),
        next = tokio::time::timeout(timeout, framed.next()) => match next {
            Err(_) => Err(BeamError::Timeout(timeout)),
            Ok(None) => Err(BeamError::ConnectionClosed),
            Ok(Some(line)) => line,
        },
    }
}

/// Tell the client why it is being dropped, if the error is its fault,
/// then shut down the write side.
pub(crate) async fn reject<T>(framed: &mut Framed<T, LineCodec>, err: &BeamError, timeout: Duration)
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let Some(diagnostic) = err.diagnostic() else {
        return;
    };

    let line = format_diagnostic(&diagnostic);
    match tokio::time::timeout(timeout, async {
        framed.send(line).await?;
        framed.close().await
    })
    .await
    {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "could not send diagnostic"),
        Err(_) => debug!("diagnostic write timed out"),
    }
}
