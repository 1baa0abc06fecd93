//! Node configuration for the Tide ledger node.
//!
//! Provides [`NodeConfig`] with defaults for data directory, RPC binding,
//! ledger parameters and snapshot cadence. Values can be layered from a TOML
//! file and `TIDE_*` environment variables through [`NodeConfig::load`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tide_core::constants::{DEFAULT_INTEREST_RATE, DEFAULT_RPC_PORT, DEFAULT_SNAPSHOT_INTERVAL_SECS};
use tide_core::error::TideError;
use tide_core::types::{HolderId, Rate};

/// Environment variable prefix, e.g. `TIDE_RPC_PORT=9000`.
pub const ENV_PREFIX: &str = "TIDE";

/// Configuration for a node instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// IP address for the JSON-RPC server to bind to.
    pub rpc_bind: String,
    /// Port for the JSON-RPC server.
    pub rpc_port: u16,
    /// Log level filter string (e.g. "info", "debug", "tide_ledger=trace").
    pub log_level: String,
    /// Global rate used when no snapshot exists yet.
    pub initial_interest_rate: Rate,
    /// Ledger owner; implicitly allowed to lower the rate and grant roles.
    pub owner: HolderId,
    /// Holder id the vault mints and burns as.
    pub vault: HolderId,
    /// Seconds between periodic snapshots.
    pub snapshot_interval_secs: u64,
    /// Shared secret required by mutating RPC methods. When unset, the RPC
    /// server is read-only. Prefer `TIDE_RPC_ADMIN_TOKEN` over the file.
    pub rpc_admin_token: Option<String>,
}

fn dev_holder(last: u8) -> HolderId {
    let mut bytes = [0u8; 20];
    bytes[19] = last;
    HolderId(bytes)
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tide");

        Self {
            data_dir,
            rpc_bind: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            log_level: "info".to_string(),
            initial_interest_rate: DEFAULT_INTEREST_RATE,
            owner: dev_holder(1),
            vault: dev_holder(2),
            snapshot_interval_secs: DEFAULT_SNAPSHOT_INTERVAL_SECS,
            rpc_admin_token: None,
        }
    }
}

impl NodeConfig {
    /// Build a config from defaults, then `path` (if given), then the
    /// environment. Later sources win.
    pub fn load(path: Option<&Path>) -> Result<Self, TideError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));

        let cfg: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| TideError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), TideError> {
        if self.owner == self.vault {
            return Err(TideError::Config(
                "owner and vault must be distinct holders".to_string(),
            ));
        }
        if self.snapshot_interval_secs == 0 {
            return Err(TideError::Config(
                "snapshot_interval_secs must be positive".to_string(),
            ));
        }
        if self.rpc_admin_token.as_deref().is_some_and(str::is_empty) {
            return Err(TideError::Config(
                "rpc_admin_token must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Path to the ledger snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("ledger.snapshot")
    }

    /// Socket address string for the RPC server.
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_bind, self.rpc_port)
    }
}
