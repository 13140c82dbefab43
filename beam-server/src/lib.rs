//! # beam-server
//!
//! Runs the beam relay: a chat relay (newline-delimited text, default
//! port 9999) and a screen relay (length-prefixed binary frames, default
//! port 9998) in one process.
//!
//! Settings come from a TOML file (see [`config::ServerConfig`]) with
//! command-line overrides for the listener address.

pub mod config;

use std::future::Future;
use std::io;

use tracing::{info, warn};

/// Resolve once `signal` reports a shutdown request.
///
/// If the signal handler cannot be installed the server keeps running
/// until it is stopped some other way.
pub async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => {
            warn!(error = %e, "could not listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
