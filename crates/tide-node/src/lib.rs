//! # tide-node — Ledger node: composition, persistence, RPC.
//!
//! Wires the Tide subsystems into a running service:
//! - [`node::Node`] — access control, ledger, vault and clock behind one handle
//! - [`rpc`] — JSON-RPC server for external access
//! - [`config::NodeConfig`] — node configuration (file + environment)

pub mod config;
pub mod node;
pub mod rpc;

pub use config::NodeConfig;
pub use node::Node;
pub use rpc::start_rpc_server;
