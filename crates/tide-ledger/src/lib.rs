//! # tide-ledger — Rebase ledger facade.
//!
//! [`RebaseToken`] is the single mutation gateway over raw balances. Every
//! mint, burn and transfer first realizes the affected holders' pending
//! interest, then applies the requested change on top, all under one lock.
//! Balance reads compute accrued interest on the fly without mutating.
//!
//! [`LedgerSnapshot`] captures the full ledger state for persistence.

pub mod snapshot;
pub mod token;

pub use snapshot::LedgerSnapshot;
pub use token::RebaseToken;
