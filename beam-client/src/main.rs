//! beam client: entry point.
//!
//! ```text
//! beam-client chat --name alice              Chat from the terminal (/quit leaves)
//! beam-client share --path shots/ --fps 5    Push image files as frames
//! beam-client watch --out frames/            Save every received frame
//! beam-client watch --out frames/ --latest   Keep only the newest frame
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use beam_core::{ChatClient, ScreenReceiver, ScreenSender};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "beam-client", about = "Chat and screen relay client")]
struct Cli {
    /// Relay host.
    #[arg(long, global = true, default_value = "localhost")]
    host: String,

    /// Chat relay port.
    #[arg(long, global = true, default_value_t = 9999)]
    chat_port: u16,

    /// Screen relay port.
    #[arg(long, global = true, default_value_t = 9998)]
    screen_port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join the chat; stdin lines are sent, relayed lines are printed.
    Chat {
        /// Display name.
        #[arg(short, long)]
        name: String,
    },
    /// Send files as screen frames.
    Share {
        /// A file, or a directory whose files are cycled in name order.
        #[arg(short, long)]
        path: PathBuf,
        /// Frames per second.
        #[arg(long, default_value_t = 10)]
        fps: u32,
        /// Send each file once and exit instead of looping.
        #[arg(long)]
        once: bool,
    },
    /// Receive screen frames and write them to disk.
    Watch {
        /// Output directory.
        #[arg(short, long)]
        out: PathBuf,
        /// Overwrite a single `latest.bin` instead of numbering frames.
        #[arg(long)]
        latest: bool,
    },
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let chat_addr = format!("{}:{}", cli.host, cli.chat_port);
    let screen_addr = format!("{}:{}", cli.host, cli.screen_port);

    match cli.command {
        Command::Chat { name } => chat(&chat_addr, &name).await,
        Command::Share { path, fps, once } => share(&screen_addr, &path, fps, once).await,
        Command::Watch { out, latest } => watch(&screen_addr, &out, latest).await,
    }
}

// ── chat ─────────────────────────────────────────────────────────

async fn chat(addr: &str, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = ChatClient::connect(addr, name).await?;
    println!("🟢 connected to {addr} as {}", client.name());
    let (mut writer, mut reader) = client.into_split();

    let mut printer = tokio::spawn(async move {
        loop {
            match reader.next_line().await {
                Ok(Some(line)) => println!("{line}"),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "chat read failed");
                    break;
                }
            }
        }
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = &mut printer => {
                println!("🔴 disconnected");
                return Ok(());
            }
            line = stdin.next_line() => line?,
        };

        let Some(line) = line else { break };
        let text = line.trim();
        if text == "/quit" {
            break;
        }
        if text.is_empty() {
            continue;
        }
        writer.send(text).await?;
    }

    writer.close().await?;
    printer.abort();
    println!("🔴 left the chat");
    Ok(())
}

// ── share ────────────────────────────────────────────────────────

async fn share(
    addr: &str,
    path: &Path,
    fps: u32,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = frame_files(path).await?;
    if files.is_empty() {
        return Err(format!("no files to share under {}", path.display()).into());
    }

    let mut sender = ScreenSender::connect(addr).await?;
    info!(files = files.len(), fps, "sharing");

    let mut ticker = tokio::time::interval(Duration::from_secs(1) / fps.max(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut sent: u64 = 0;
    'outer: loop {
        for file in &files {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break 'outer,
                _ = ticker.tick() => {}
            }
            let bytes = tokio::fs::read(file).await?;
            debug!(file = %file.display(), size = bytes.len(), "sending frame");
            sender.send_frame(bytes).await?;
            sent += 1;
        }
        if once {
            break;
        }
    }

    sender.close().await?;
    info!(frames = sent, "sharing stopped");
    Ok(())
}

/// The file itself, or the regular files of a directory sorted by name.
async fn frame_files(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !tokio::fs::metadata(path).await?.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

// ── watch ────────────────────────────────────────────────────────

async fn watch(addr: &str, out: &Path, latest: bool) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(out).await?;
    let mut receiver = ScreenReceiver::connect(addr).await?;
    info!(out = %out.display(), "watching");

    let mut count: u64 = 0;
    loop {
        let frame = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            frame = receiver.next_frame() => frame?,
        };
        let Some(frame) = frame else {
            info!("relay closed the connection");
            break;
        };

        let name = if latest {
            "latest.bin".to_string()
        } else {
            format!("frame-{count:06}.bin")
        };
        tokio::fs::write(out.join(name), frame.payload()).await?;
        count += 1;
    }

    info!(frames = count, "watch stopped");
    Ok(())
}
