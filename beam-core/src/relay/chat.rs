//! Chat relay: one task per connection.
//!
//! `Handshaking → Chatting → Closed`. The first line is the display
//! name; every later non-blank line is stamped and fanned out to all
//! other sessions. The sender never receives its own messages.

use std::sync::Arc;

use chrono::Local;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec::LineCodec;
use crate::error::BeamError;
use crate::network::spawn_writer;
use crate::protocol::{format_diagnostic, format_join, format_leave, format_message, validate_name};
use crate::relay::{RelayContext, read_handshake, reject};
use crate::state::SessionPhase;

/// Run the chat protocol on `io` until the peer leaves, misbehaves, or
/// `cancel` fires.
///
/// A clean disconnect returns `Ok(())`. Protocol violations return the
/// error after the client has been sent a diagnostic line.
pub async fn serve_chat<T>(
    io: T,
    ctx: Arc<RelayContext>,
    cancel: CancellationToken,
) -> Result<(), BeamError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let config = &ctx.config;
    let mut phase = SessionPhase::default();
    let mut framed = Framed::new(io, LineCodec::new(config.max_line_length));

    let handshake = read_handshake(&mut framed, config.handshake_timeout, &cancel)
        .await
        .and_then(|line| validate_name(&line));
    let name = match handshake {
        Ok(name) => name,
        Err(e) => {
            reject(&mut framed, &e, config.peer.write_timeout).await;
            return Err(e);
        }
    };

    let (sink, mut lines) = framed.split();
    let (handle, writer) = spawn_writer(sink, config.peer, cancel.clone());

    let session = match ctx.chat.add(name.clone(), handle.clone()).await {
        Ok(session) => session,
        Err(e) => {
            if let Some(diagnostic) = e.diagnostic() {
                let _ = handle.deliver(format_diagnostic(&diagnostic)).await;
            }
            drop(handle);
            writer.finish(config.peer.write_timeout).await;
            return Err(e);
        }
    };
    phase.join_chat()?;

    info!(name = %name, peer = session.id(), "joined chat");
    ctx.chat.broadcast_excluding(&name, &format_join(&name)).await;

    let outcome = relay_lines(&ctx, &name, &mut lines, &cancel).await;
    if let Some(diagnostic) = outcome.as_ref().err().and_then(BeamError::diagnostic) {
        let _ = handle.deliver(format_diagnostic(&diagnostic)).await;
    }

    phase.close()?;
    let evicted = !ctx.chat.remove_session(&session).await;
    let member_for = session.joined_at().elapsed();
    drop(session);
    ctx.chat.broadcast_excluding(&name, &format_leave(&name)).await;

    drop(handle);
    writer.finish(config.peer.write_timeout).await;
    info!(name = %name, duration = ?member_for, evicted, "left chat");

    outcome
}

async fn relay_lines<S>(
    ctx: &RelayContext,
    name: &str,
    lines: &mut S,
    cancel: &CancellationToken,
) -> Result<(), BeamError>
where
    S: Stream<Item = Result<String, BeamError>> + Unpin,
{
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            next = lines.next() => next,
        };

        let text = match next {
            None => return Ok(()),
            Some(Err(e)) if e.is_disconnect() => return Ok(()),
            Some(Err(e)) => return Err(e),
            Some(Ok(text)) => text,
        };

        if text.trim().is_empty() {
            continue;
        }

        let line = format_message(Local::now(), name, &text);
        let delivered = ctx.chat.broadcast_excluding(name, &line).await;
        debug!(name, delivered, "relayed chat message");
    }
}
