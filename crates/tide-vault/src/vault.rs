//! The vault: the ledger's only minter in a standard deployment.
//!
//! The vault holds [`Capability::MintAndBurn`](tide_core::types::Capability)
//! under its own holder id. Interest realized on the ledger is newly issued
//! shares with no asset behind it, so reserves must be topped up through
//! [`Vault::add_rewards`] before accrued interest can be redeemed in full.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tide_core::error::{TideError, VaultError};
use tide_core::types::{Amount, HolderId, Timestamp};
use tide_ledger::{LedgerSnapshot, RebaseToken};

/// Amount argument for redemptions.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RedeemAmount {
    Exact(Amount),
    /// The redeemer's whole accrued balance at the redemption timestamp.
    All,
}

impl From<Amount> for RedeemAmount {
    fn from(amount: Amount) -> Self {
        Self::Exact(amount)
    }
}

/// Outcome of a redemption.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Redemption {
    /// Shares burned from the redeemer.
    pub burned: Amount,
    /// Asset paid out of reserves.
    pub paid: Amount,
}

pub struct Vault {
    id: HolderId,
    token: Arc<RebaseToken>,
    /// Asset held against outstanding shares. The lock also serialises
    /// deposits and redemptions against each other.
    reserves: Mutex<Amount>,
}

impl Vault {
    /// Create a vault acting as `id` on `token`. `id` must hold the
    /// mint-and-burn capability for deposits and redemptions to succeed.
    pub fn new(id: HolderId, token: Arc<RebaseToken>) -> Self {
        Self::with_reserves(id, token, 0)
    }

    /// Create a vault with pre-existing reserves (e.g. after a restart).
    pub fn with_reserves(id: HolderId, token: Arc<RebaseToken>, reserves: Amount) -> Self {
        Self {
            id,
            token,
            reserves: Mutex::new(reserves),
        }
    }

    pub fn id(&self) -> HolderId {
        self.id
    }

    pub fn token(&self) -> &Arc<RebaseToken> {
        &self.token
    }

    /// Asset currently held.
    pub fn reserves(&self) -> Amount {
        *self.reserves.lock()
    }

    /// Accept `value` of asset from `depositor` and mint as many shares at the
    /// current global rate. Returns the depositor's resulting raw balance.
    pub fn deposit(
        &self,
        depositor: &HolderId,
        value: Amount,
        now: Timestamp,
    ) -> Result<Amount, TideError> {
        if value == 0 {
            return Err(VaultError::ZeroDeposit.into());
        }
        let mut reserves = self.reserves.lock();
        let new_reserves = reserves
            .checked_add(value)
            .ok_or(VaultError::ReserveOverflow)?;

        let rate = self.token.interest_rate();
        let raw_balance = self.token.mint(&self.id, depositor, value, rate, now)?;
        *reserves = new_reserves;

        info!(%depositor, value, rate, reserves = new_reserves, "vault: deposit");
        Ok(raw_balance)
    }

    /// Burn shares from `redeemer` and pay out the same amount of asset.
    ///
    /// [`RedeemAmount::All`] is resolved to the accrued balance at `now`
    /// before the burn, so nothing is left behind.
    pub fn redeem(
        &self,
        redeemer: &HolderId,
        amount: impl Into<RedeemAmount>,
        now: Timestamp,
    ) -> Result<Redemption, TideError> {
        let mut reserves = self.reserves.lock();
        let resolved = match amount.into() {
            RedeemAmount::Exact(value) => value,
            RedeemAmount::All => self.token.balance_of(redeemer, now)?,
        };
        if resolved > *reserves {
            return Err(VaultError::InsufficientReserves {
                have: *reserves,
                need: resolved,
            }
            .into());
        }

        self.token.burn(&self.id, redeemer, resolved, now)?;
        *reserves -= resolved;

        info!(%redeemer, amount = resolved, reserves = *reserves, "vault: redeem");
        Ok(Redemption {
            burned: resolved,
            paid: resolved,
        })
    }

    /// Capture the ledger together with the reserves backing it.
    ///
    /// Holds the reserves lock across the ledger snapshot, so no deposit or
    /// redemption can land between the two reads.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let reserves = self.reserves.lock();
        self.token.snapshot().with_reserves(*reserves)
    }

    /// Add asset to reserves without minting shares. Returns the new reserves.
    pub fn add_rewards(&self, value: Amount) -> Result<Amount, TideError> {
        let mut reserves = self.reserves.lock();
        *reserves = reserves
            .checked_add(value)
            .ok_or(VaultError::ReserveOverflow)?;
        debug!(value, reserves = *reserves, "vault: rewards added");
        Ok(*reserves)
    }
}
