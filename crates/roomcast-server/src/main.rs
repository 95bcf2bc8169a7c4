//! Roomcast server binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 0.0.0.0:5000, 10000 connections, info logging
//! roomcast-server
//!
//! # Explicit bind address and limit
//! roomcast-server --bind 127.0.0.1:8080 --max-connections 500
//! ```
//!
//! Clients connect to `ws://<addr>/ws` and speak the JSON event protocol
//! (`join`, `message`, `leave`).

use clap::Parser;
use roomcast_server::{DriverConfig, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Roomcast chat server
#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Room-scoped broadcast chat server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:5000")]
    bind: String,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("roomcast server starting");
    tracing::info!("binding to {}", args.bind);

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        driver: DriverConfig { max_connections: args.max_connections },
    };

    let server = Server::bind(config).await?;

    server.run().await?;

    Ok(())
}
