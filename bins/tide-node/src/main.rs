//! Tide ledger node binary.
//!
//! Loads configuration, restores the ledger snapshot, serves JSON-RPC and
//! writes periodic snapshots until interrupted.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tide_core::types::{HolderId, Rate};
use tide_node_lib::{start_rpc_server, Node, NodeConfig};
use tracing::{error, info, warn};

/// Tide ledger node.
#[derive(Parser, Debug)]
#[command(
    name = "tide-node",
    version,
    about = "Interest-bearing rebase ledger node with JSON-RPC server"
)]
struct Args {
    /// Config file (TOML). `TIDE_*` environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for snapshots
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// RPC server bind address
    #[arg(long)]
    rpc_bind: Option<String>,

    /// RPC server port
    #[arg(long)]
    rpc_port: Option<u16>,

    /// Global interest rate for a fresh ledger (per second, scaled by 1e18)
    #[arg(long)]
    initial_interest_rate: Option<Rate>,

    /// Owner holder id (hex)
    #[arg(long)]
    owner: Option<HolderId>,

    /// Vault holder id (hex)
    #[arg(long)]
    vault: Option<HolderId>,

    /// Seconds between snapshots
    #[arg(long)]
    snapshot_interval_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

impl Args {
    /// Layer CLI flags over the file/environment config.
    fn into_config(self) -> anyhow::Result<(NodeConfig, String)> {
        let mut config = NodeConfig::load(self.config.as_deref())
            .context("failed to load configuration")?;

        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(rpc_bind) = self.rpc_bind {
            config.rpc_bind = rpc_bind;
        }
        if let Some(rpc_port) = self.rpc_port {
            config.rpc_port = rpc_port;
        }
        if let Some(rate) = self.initial_interest_rate {
            config.initial_interest_rate = rate;
        }
        if let Some(owner) = self.owner {
            config.owner = owner;
        }
        if let Some(vault) = self.vault {
            config.vault = vault;
        }
        if let Some(secs) = self.snapshot_interval_secs {
            config.snapshot_interval_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        config.validate()?;

        Ok((config, self.log_format))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, log_format) = args.into_config()?;

    init_logging(&config.log_level, &log_format);

    info!("Tide Node v{}", env!("CARGO_PKG_VERSION"));
    info!("data_dir: {:?}", config.data_dir);
    info!("rpc_addr: {}", config.rpc_addr());
    info!("owner: {} vault: {}", config.owner, config.vault);

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create data_dir {:?}", config.data_dir))?;

    let node = Node::new(config.clone()).context("failed to start node")?;
    info!(
        interest_rate = node.interest_rate(),
        total_supply = node.total_supply(),
        reserves = node.reserves(),
        "node initialized"
    );

    let rpc_handle = start_rpc_server(&config.rpc_addr(), node.clone())
        .await
        .context("failed to start RPC server")?;
    info!("RPC server listening on {}", config.rpc_addr());
    if config.rpc_admin_token.is_none() {
        warn!("rpc_admin_token not set; mutating RPC methods are disabled");
    }

    info!("Tide node running (Ctrl+C to stop)");

    tokio::select! {
        _ = node.run() => {
            info!("node loop exited");
        }
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => info!("received Ctrl+C, shutting down..."),
                Err(e) => error!("failed to listen for Ctrl+C: {e}"),
            }
        }
    }

    rpc_handle.stop().ok();
    info!("RPC server stopped");

    node.save_snapshot().context("failed to write final snapshot")?;
    info!("Tide node shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
