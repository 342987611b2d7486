//! sockctl: talk to a process control socket.
//!
//! Two modes:
//! - `send`: connect, send one command with its arguments, print the reply
//! - `serve`: host a control socket with the built-in commands until
//!   interrupted
//!
//! Configuration via CLI arguments or TOML file.

mod config;

use config::{Config, Mode};
use sockctl::{Client, Control};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging; stdout is reserved for replies
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match config.mode {
        Mode::Send { args } => send(&config.socket, &args).await,
        Mode::Serve => serve(&config.socket).await,
    }
}

/// Send one command and print its reply, even when empty
async fn send(socket: &Path, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = Client::connect(socket)
        .await
        .map_err(|e| format!("Couldn't connect to {}: {e}", socket.display()))?;

    let reply = client
        .send(args)
        .await
        .map_err(|e| format!("Error reading response from command: {e}"))?;

    println!("{reply}");
    Ok(())
}

/// Serve the built-in commands until Ctrl-C
async fn serve(socket: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut control = Control::new(socket);
    control.start().await?;
    info!(socket = %socket.display(), "Serving control socket, Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    control.stop();
    Ok(())
}
