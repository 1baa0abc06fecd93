//! # tide-core
//! Foundation types, errors and trait seams for the Tide rebase ledger.
//!
//! Also hosts the in-memory reference implementations of the ledger's
//! collaborators: the raw account ledger, the access-control table and the
//! clocks.

pub mod access;
pub mod account_ledger;
pub mod clock;
pub mod constants;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;
