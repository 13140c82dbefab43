//! Screen relay: one task per connection.
//!
//! `Handshaking → {Sending | Receiving} → Closed`.
//!
//! - A **sender** pushes frames; each frame is fanned out to every
//!   registered receiver before the next one is read, so one sender's
//!   stream reaches each receiver in order.
//! - A **receiver** is a pure sink. Its socket is only read to notice
//!   when the peer goes away; anything it sends is discarded.

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_util::codec::{Framed, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::codec::{FrameCodec, LineCodec};
use crate::error::BeamError;
use crate::network::spawn_writer;
use crate::protocol::Role;
use crate::relay::{RelayContext, read_handshake, reject};
use crate::state::SessionPhase;

/// Longest role line accepted during the handshake.
const ROLE_LINE_MAX: usize = 64;

/// Run the screen protocol on `io` until the peer leaves, misbehaves,
/// or `cancel` fires.
pub async fn serve_screen<T>(
    io: T,
    ctx: Arc<RelayContext>,
    cancel: CancellationToken,
) -> Result<(), BeamError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let config = &ctx.config;
    let mut phase = SessionPhase::default();
    let mut framed = Framed::new(io, LineCodec::new(ROLE_LINE_MAX));

    let handshake = read_handshake(&mut framed, config.handshake_timeout, &cancel)
        .await
        .and_then(|line| line.parse::<Role>());
    let role = match handshake {
        Ok(role) => role,
        Err(e) => {
            reject(&mut framed, &e, config.peer.write_timeout).await;
            return Err(e);
        }
    };
    phase.assume_role(role)?;
    info!(%role, "screen peer ready");

    let codec = FrameCodec::new(config.max_frame_size);
    let outcome = match role {
        Role::Sender => relay_frames(framed.map_codec(|_| codec), &ctx, &cancel).await,
        Role::Receiver => sink_frames(framed, codec, &ctx, &cancel).await,
    };

    let active = phase.active_duration();
    phase.close()?;
    info!(%role, duration = ?active, "screen peer closed");
    outcome
}

/// Sender loop: read frames and fan each one out.
async fn relay_frames<T>(
    mut frames: Framed<T, FrameCodec>,
    ctx: &RelayContext,
    cancel: &CancellationToken,
) -> Result<(), BeamError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut relayed: u64 = 0;
    let mut bytes: u64 = 0;

    let outcome = loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            next = frames.next() => next,
        };

        match next {
            None => break Ok(()),
            Some(Err(e)) if e.is_disconnect() => break Ok(()),
            Some(Err(e)) => break Err(e),
            Some(Ok(frame)) => {
                let receivers = ctx.receivers.broadcast(&frame).await;
                relayed += 1;
                bytes += frame.len() as u64;
                trace!(size = frame.len(), receivers, "relayed frame");
            }
        }
    };

    debug!(frames = relayed, bytes, "sender finished");
    if let Err(e) = &outcome {
        let mut lines = frames.map_codec(|_| LineCodec::default());
        reject(&mut lines, e, ctx.config.peer.write_timeout).await;
    }
    outcome
}

/// Receiver loop: register a writer, then wait for the peer to leave.
async fn sink_frames<T>(
    framed: Framed<T, LineCodec>,
    codec: FrameCodec,
    ctx: &RelayContext,
    cancel: &CancellationToken,
) -> Result<(), BeamError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let parts = framed.into_parts();
    let (read_half, write_half) = tokio::io::split(parts.io);
    let sink = FramedWrite::new(write_half, codec);
    let (handle, writer) = spawn_writer(sink, ctx.config.peer, cancel.clone());

    let id = ctx.receivers.add(handle.clone()).await;
    debug!(peer = id, "receiver registered");

    let outcome = tokio::select! {
        _ = cancel.cancelled() => Ok(()),
        closed = wait_for_close(read_half) => match closed {
            Err(e) if e.is_disconnect() => Ok(()),
            other => other,
        },
    };

    ctx.receivers.remove(id).await;
    drop(handle);
    writer.finish(ctx.config.peer.write_timeout).await;
    outcome
}

async fn wait_for_close<R>(mut reader: R) -> Result<(), BeamError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf).await? {
            0 => return Ok(()),
            n => trace!(bytes = n, "discarding receiver input"),
        }
    }
}
