//! Socket Manager CLI Entry Point
//!
//! Connects to a WebSocket endpoint, prints every inbound payload to stdout
//! and sends each line read from stdin.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use socket_manager::cli::config::Config;
use socket_manager::cli::logging;
use socket_manager::runtime::driver::SocketManagerBuilder;

#[derive(Parser)]
#[command(name = "socket-manager")]
#[command(author, version, about = "Persistent WebSocket connection with heartbeat and auto-reconnect")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/socket-manager.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and relay stdin/stdout until EOF or Ctrl-C
    Connect {
        /// WebSocket endpoint, overrides the config file
        #[arg(short, long, env = "SOCKET_MANAGER_ENDPOINT")]
        endpoint: Option<String>,

        /// Client identifier, overrides the config file
        #[arg(long, env = "SOCKET_MANAGER_CLIENT_ID")]
        client_id: Option<String>,
    },
    /// Write the default configuration file
    InitConfig {
        /// Destination path (defaults to --config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Connect {
            endpoint,
            client_id,
        } => {
            let mut config = Config::load_or_default(&cli.config)?;
            if let Some(endpoint) = endpoint {
                config.connection.endpoint = endpoint;
            }
            if let Some(client_id) = client_id {
                config.connection.client_id = client_id;
            }
            logging::init(&config.logging, cli.verbose)?;
            run_connect(config).await?;
        }
        Commands::InitConfig { output } => {
            let path = output.unwrap_or(cli.config);
            init_config(&path)?;
        }
        Commands::Version => {
            show_version();
        }
    }

    Ok(())
}

async fn run_connect(config: Config) -> Result<()> {
    info!(
        endpoint = %config.connection.endpoint,
        client_id = %config.connection.client_id,
        "Starting socket manager"
    );

    let settings = config.connection.validated_settings()?;

    let (manager, task) = SocketManagerBuilder::from_settings(settings)
        .connect_timeout(config.connection.connect_timeout())
        .on_message(|payload| println!("{}", payload))
        .spawn();
    manager.initialize();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => manager.send_message(line),
                    None => {
                        info!("Input closed");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
        }
    }

    manager.shutdown();
    task.await.context("Connection manager task failed")?;
    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Config::default_config().save(path)?;
    println!("Configuration written to {}", path.display());
    Ok(())
}

fn show_version() {
    println!("socket-manager {}", env!("CARGO_PKG_VERSION"));
    println!("Persistent WebSocket connection manager");
    println!();
    println!("Features:");
    println!("  - Heartbeat while the connection is open");
    println!("  - Fixed-delay reconnection with an attempt ceiling");
    println!("  - Session token sent as WebSocket sub-protocol");
}
