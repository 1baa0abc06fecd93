//! # tide-vault — Deposit/redeem vault.
//!
//! Exchanges an external asset for ledger shares 1:1. Deposits mint at the
//! ledger's current global rate; redemptions burn shares and pay the same
//! amount of asset back out of the vault's reserves.

pub mod vault;

pub use vault::{RedeemAmount, Redemption, Vault};
