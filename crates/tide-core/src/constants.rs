//! Ledger constants. Interest rates are fixed-point values over [`RATE_PRECISION`].

/// Fixed-point denominator for interest rates (1.0 == `10^18`).
pub const RATE_PRECISION: u64 = 1_000_000_000_000_000_000;

/// Interest rate the global policy starts with: `5 * 10^-8` per second.
///
/// # Examples
///
/// ```
/// use tide_core::constants::{DEFAULT_INTEREST_RATE, RATE_PRECISION};
/// assert_eq!(DEFAULT_INTEREST_RATE, 50_000_000_000);
/// assert!(DEFAULT_INTEREST_RATE < RATE_PRECISION);
/// ```
pub const DEFAULT_INTEREST_RATE: u64 = 50_000_000_000;

pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Default TCP port for the node's JSON-RPC server.
pub const DEFAULT_RPC_PORT: u16 = 18_645;

/// Default interval between ledger snapshots written by the node.
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 60;

/// Capacity of the ledger event broadcast channel.
///
/// Slow subscribers past this many buffered events observe a lag error and
/// skip ahead; ledger operations never wait on subscribers.
pub const EVENT_CHANNEL_CAPACITY: usize = 1_024;

/// Length in bytes of a [`HolderId`](crate::types::HolderId).
pub const HOLDER_ID_LEN: usize = 20;
