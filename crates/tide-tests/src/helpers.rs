//! Shared test helpers for integration and property tests.

use std::sync::Arc;

use tide_core::access::AccessControl;
use tide_core::constants::DEFAULT_INTEREST_RATE;
use tide_core::types::{Capability, HolderAccount, HolderId, Timestamp};
use tide_ledger::RebaseToken;
use tide_vault::Vault;

/// Ledger owner in every fixture.
pub const OWNER: HolderId = HolderId([0xF0; 20]);
/// Holder the vault acts as.
pub const VAULT: HolderId = HolderId([0xF1; 20]);

/// Start time for fixtures (Unix seconds).
pub const T0: Timestamp = 1_700_000_000;

/// Simple holder id from a seed byte.
pub fn holder(seed: u8) -> HolderId {
    HolderId([seed; 20])
}

/// A token at the default rate with a vault granted mint-and-burn.
pub fn setup() -> (Arc<RebaseToken>, Vault) {
    setup_with_rate(DEFAULT_INTEREST_RATE)
}

/// Like [`setup`] with an explicit starting rate.
pub fn setup_with_rate(rate: u64) -> (Arc<RebaseToken>, Vault) {
    let acl = AccessControl::new(OWNER);
    acl.grant(&OWNER, &VAULT, Capability::MintAndBurn).unwrap();
    let token = Arc::new(RebaseToken::new(rate, Arc::new(acl)));
    let vault = Vault::new(VAULT, Arc::clone(&token));
    (token, vault)
}

/// Everything observable about a holder, for "nothing changed" assertions.
pub fn observe(token: &RebaseToken, holders: &[HolderId]) -> (Vec<HolderAccount>, u64) {
    let accounts = holders.iter().map(|h| token.account(h)).collect();
    (accounts, token.total_supply())
}
