//! beam relay server: entry point.
//!
//! ```text
//! beam-server                    Run with ./beam-server.toml (or defaults)
//! beam-server --config <path>    Load a custom config TOML
//! beam-server --gen-config       Write default config to stdout
//! beam-server --host 0.0.0.0 --chat-port 9999 --screen-port 9998
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beam_core::RelayServer;
use beam_server::config::ServerConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "beam-server", about = "Chat and screen relay server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "beam-server.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the chat port.
    #[arg(long)]
    chat_port: Option<u16>,

    /// Override the screen port.
    #[arg(long)]
    screen_port: Option<u16>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", ServerConfig::default_toml()?);
        return Ok(());
    }

    let mut config = ServerConfig::load(&cli.config)?;
    if let Some(host) = cli.host {
        config.network.host = host;
    }
    if let Some(port) = cli.chat_port {
        config.network.chat_port = port;
    }
    if let Some(port) = cli.screen_port {
        config.network.screen_port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("beam-server v{}", env!("CARGO_PKG_VERSION"));

    let server = RelayServer::bind(config.to_relay_config()).await?;
    info!("chat relay on {}", server.chat_addr()?);
    info!("screen relay on {}", server.screen_addr()?);

    server
        .run_until(beam_server::shutdown_signal(tokio::signal::ctrl_c()))
        .await?;

    Ok(())
}
