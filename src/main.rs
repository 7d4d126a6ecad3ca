//! text-ferry: single-shot text file transfer over TCP
//!
//! One binary, two roles:
//! - `server`: accept one connection, store (`send`) or serve (`download`)
//!   a fixed file, then exit
//! - `client`: connect, announce the command, stream the file, then exit
//!
//! Configuration via CLI arguments or TOML file.

mod client;
mod config;
mod error;
mod protocol;
mod server;
mod transfer;

use config::{Config, Role};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match config.role {
        Role::Server(server) => run_server(server),
        Role::Client {
            settings,
            command,
            filepath,
        } => run_client(settings, &command, &filepath),
    }
}

/// Serve one transfer on the configured port
fn run_server(config: config::ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        bind = %config.bind,
        port = config.port,
        target_file = %config.target_file.display(),
        timeout = ?config.timeout,
        "Starting text-ferry server"
    );

    match server::serve(&config) {
        Ok(outcome) => {
            info!(?outcome, "Transfer complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Server failed");
            Err(e.into())
        }
    }
}

/// Run one client request
fn run_client(
    config: config::ClientConfig,
    command: &str,
    filepath: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        host = %config.host,
        port = config.port,
        command,
        filepath = %filepath.display(),
        "Starting text-ferry client"
    );

    if let Err(e) = client::run(&config, command, filepath) {
        error!(error = %e, "Client failed");
        return Err(e.into());
    }

    Ok(())
}
