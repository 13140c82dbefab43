//! Client side of both protocols.
//!
//! Thin wrappers over a framed `TcpStream` that perform the handshake on
//! connect. Used by the `beam-client` binary and the integration tests.

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::codec::{FrameCodec, LineCodec};
use crate::error::BeamError;
use crate::frame::Frame;
use crate::protocol::{Role, validate_name};

type LineStream = Framed<TcpStream, LineCodec>;

// ── Chat ─────────────────────────────────────────────────────────

/// A joined chat session.
#[derive(Debug)]
pub struct ChatClient {
    name: String,
    lines: LineStream,
}

impl ChatClient {
    /// Connect and announce `name`.
    ///
    /// The name is checked locally first; the server may still reject it
    /// (for example when it is taken), which shows up as a `! ...` line
    /// followed by end of stream.
    pub async fn connect<A: ToSocketAddrs>(addr: A, name: &str) -> Result<Self, BeamError> {
        let name = validate_name(name)?;
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let mut lines = Framed::new(stream, LineCodec::default());
        lines.send(name.clone()).await?;
        debug!(%name, "chat handshake sent");
        Ok(Self { name, lines })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn send(&mut self, text: &str) -> Result<(), BeamError> {
        self.lines.send(text.to_owned()).await
    }

    /// Next line from the server, or `None` once it closes the connection.
    pub async fn next_line(&mut self) -> Result<Option<String>, BeamError> {
        self.lines.next().await.transpose()
    }

    /// Split into independently owned write and read halves.
    pub fn into_split(self) -> (ChatWriter, ChatReader) {
        let (sink, stream) = self.lines.split();
        (ChatWriter { sink }, ChatReader { stream })
    }

    /// Leave the chat by closing the connection.
    pub async fn close(mut self) -> Result<(), BeamError> {
        self.lines.close().await
    }
}

/// Write half of a [`ChatClient`].
#[derive(Debug)]
pub struct ChatWriter {
    sink: SplitSink<LineStream, String>,
}

impl ChatWriter {
    pub async fn send(&mut self, text: &str) -> Result<(), BeamError> {
        self.sink.send(text.to_owned()).await
    }

    pub async fn close(mut self) -> Result<(), BeamError> {
        self.sink.close().await
    }
}

/// Read half of a [`ChatClient`].
#[derive(Debug)]
pub struct ChatReader {
    stream: SplitStream<LineStream>,
}

impl ChatReader {
    pub async fn next_line(&mut self) -> Result<Option<String>, BeamError> {
        self.stream.next().await.transpose()
    }
}

// ── Screen ───────────────────────────────────────────────────────

async fn screen_connect<A: ToSocketAddrs>(
    addr: A,
    role: Role,
) -> Result<Framed<TcpStream, FrameCodec>, BeamError> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    stream.write_all(format!("{role}\n").as_bytes()).await?;
    debug!(%role, "screen handshake sent");
    Ok(Framed::new(stream, FrameCodec::default()))
}

/// Pushes frames to every receiver on the relay.
#[derive(Debug)]
pub struct ScreenSender {
    frames: Framed<TcpStream, FrameCodec>,
}

impl ScreenSender {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, BeamError> {
        Ok(Self {
            frames: screen_connect(addr, Role::Sender).await?,
        })
    }

    /// Send `payload` as one frame.
    pub async fn send_frame(&mut self, payload: impl Into<Bytes>) -> Result<(), BeamError> {
        self.frames.send(Frame::new(payload)).await
    }

    pub async fn close(mut self) -> Result<(), BeamError> {
        self.frames.close().await
    }
}

/// Receives every frame any sender pushes after registration.
#[derive(Debug)]
pub struct ScreenReceiver {
    frames: Framed<TcpStream, FrameCodec>,
}

impl ScreenReceiver {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, BeamError> {
        Ok(Self {
            frames: screen_connect(addr, Role::Receiver).await?,
        })
    }

    /// Next frame, or `None` once the relay closes the connection.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, BeamError> {
        match self.frames.next().await {
            None => Ok(None),
            Some(Err(BeamError::ConnectionClosed)) => Ok(None),
            Some(other) => other.map(Some),
        }
    }
}
