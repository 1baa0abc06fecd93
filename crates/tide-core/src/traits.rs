//! Trait interfaces for the Tide ledger.
//!
//! These traits define the contracts between crates:
//! - [`AccountLedger`] — raw balance bookkeeping (in-memory impl in [`account_ledger`](crate::account_ledger))
//! - [`InterestCalculator`] — accrual math (tide-accrual implements)
//! - [`Authorizer`] — capability checks (in-memory impl in [`access`](crate::access))
//! - [`Clock`] — source of "now" for the composition layer

use crate::error::{AccountError, AccrualError, AuthError};
use crate::types::{Amount, Capability, HolderAccount, HolderId, Rate, Timestamp};

/// Raw (non-accrued) balance bookkeeping.
///
/// Knows nothing about interest: the ledger facade realizes accrued interest
/// through [`mint_raw`](Self::mint_raw) before any other mutation. Mutators
/// return the resulting raw balance(s) and leave state untouched on error.
pub trait AccountLedger: Send + Sync {
    /// Stored balance of a holder. Unknown holders have zero.
    fn raw_balance_of(&self, holder: &HolderId) -> Amount;

    /// Sum of all raw balances.
    fn total_supply(&self) -> Amount;

    /// Credit newly issued units to `holder`.
    ///
    /// # Errors
    ///
    /// - [`AccountError::SupplyOverflow`] if total supply would overflow
    fn mint_raw(&mut self, holder: &HolderId, amount: Amount) -> Result<Amount, AccountError>;

    /// Destroy units held by `holder`.
    ///
    /// # Errors
    ///
    /// - [`AccountError::InsufficientBalance`] if `amount` exceeds the raw balance
    fn burn_raw(&mut self, holder: &HolderId, amount: Amount) -> Result<Amount, AccountError>;

    /// Move stored units between holders. Returns `(from_balance, to_balance)`.
    ///
    /// # Errors
    ///
    /// - [`AccountError::InsufficientBalance`] if `amount` exceeds the sender's raw balance
    fn transfer_raw(
        &mut self,
        from: &HolderId,
        to: &HolderId,
        amount: Amount,
    ) -> Result<(Amount, Amount), AccountError>;

    /// Units `spender` may move on behalf of `owner`.
    fn allowance(&self, owner: &HolderId, spender: &HolderId) -> Amount;

    /// Set the allowance of `spender` over `owner`'s balance.
    fn approve(&mut self, owner: &HolderId, spender: &HolderId, amount: Amount);

    /// Consume part of an allowance. Returns the remaining allowance.
    ///
    /// An allowance of `Amount::MAX` is treated as unlimited and never decreases.
    ///
    /// # Errors
    ///
    /// - [`AccountError::InsufficientAllowance`] if `amount` exceeds the allowance
    fn spend_allowance(
        &mut self,
        owner: &HolderId,
        spender: &HolderId,
        amount: Amount,
    ) -> Result<Amount, AccountError>;

    /// Every holder with a non-zero raw balance.
    fn holders(&self) -> Vec<(HolderId, Amount)>;

    /// Every non-zero allowance as `(owner, spender, amount)`.
    fn allowances(&self) -> Vec<(HolderId, HolderId, Amount)>;
}

/// Pure computation of linear interest.
///
/// `accrued = raw * (RATE_PRECISION + rate * elapsed) / RATE_PRECISION`,
/// truncated toward zero. Implemented by the accrual engine (tide-accrual).
pub trait InterestCalculator: Send + Sync {
    /// Growth factor after `elapsed` seconds at `rate`, over `RATE_PRECISION`.
    fn interest_factor(&self, rate: Rate, elapsed: u64) -> Result<u128, AccrualError>;

    /// Interest-adjusted balance of `account` at `now`. Never mutates.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::ClockRegression`] if `now` precedes the last accrual
    /// - [`AccrualError::ArithmeticOverflow`] if the result does not fit
    fn accrued_balance(
        &self,
        account: &HolderAccount,
        now: Timestamp,
    ) -> Result<Amount, AccrualError>;

    /// Interest earned since the last accrual and not yet realized.
    ///
    /// Default implementation: `accrued_balance(...) - raw_balance`.
    fn pending_interest(
        &self,
        account: &HolderAccount,
        now: Timestamp,
    ) -> Result<Amount, AccrualError> {
        let accrued = self.accrued_balance(account, now)?;
        accrued
            .checked_sub(account.raw_balance)
            .ok_or(AccrualError::ArithmeticOverflow)
    }
}

/// Capability checks for privileged ledger operations.
///
/// The ledger only asks whether a holder possesses a capability; granting and
/// revoking belong to the implementation.
pub trait Authorizer: Send + Sync {
    /// The administrative owner.
    fn owner(&self) -> HolderId;

    /// Whether `holder` currently possesses `capability`.
    fn has_capability(&self, holder: &HolderId, capability: Capability) -> bool;

    /// Fail with [`AuthError::Unauthorized`] unless `holder` has `capability`.
    ///
    /// Default implementation delegates to [`has_capability`](Self::has_capability).
    fn ensure(&self, holder: &HolderId, capability: Capability) -> Result<(), AuthError> {
        if self.has_capability(holder, capability) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized {
                holder: *holder,
                capability,
            })
        }
    }
}

/// Monotonic source of timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------
    // Mock: InterestCalculator
    // ------------------------------------------------------------------

    /// Grows every balance by a flat `bonus` per elapsed second.
    struct FlatBonus {
        bonus: u64,
    }

    impl InterestCalculator for FlatBonus {
        fn interest_factor(&self, _rate: Rate, _elapsed: u64) -> Result<u128, AccrualError> {
            Ok(1)
        }

        fn accrued_balance(
            &self,
            account: &HolderAccount,
            now: Timestamp,
        ) -> Result<Amount, AccrualError> {
            let elapsed = now.checked_sub(account.last_accrual).ok_or(
                AccrualError::ClockRegression {
                    last_accrual: account.last_accrual,
                    now,
                },
            )?;
            Ok(account.raw_balance + self.bonus * elapsed)
        }
    }

    // ------------------------------------------------------------------
    // Mock: Authorizer
    // ------------------------------------------------------------------

    struct OnlyOwner(HolderId);

    impl Authorizer for OnlyOwner {
        fn owner(&self) -> HolderId {
            self.0
        }

        fn has_capability(&self, holder: &HolderId, _capability: Capability) -> bool {
            *holder == self.0
        }
    }

    #[test]
    fn pending_interest_default_impl() {
        let calc = FlatBonus { bonus: 3 };
        let account = HolderAccount {
            raw_balance: 100,
            snapshot_rate: 0,
            last_accrual: 10,
        };
        assert_eq!(calc.pending_interest(&account, 20).unwrap(), 30);
        assert_eq!(calc.pending_interest(&account, 10).unwrap(), 0);
    }

    #[test]
    fn pending_interest_propagates_clock_regression() {
        let calc = FlatBonus { bonus: 1 };
        let account = HolderAccount {
            raw_balance: 1,
            snapshot_rate: 0,
            last_accrual: 50,
        };
        assert_eq!(
            calc.pending_interest(&account, 49).unwrap_err(),
            AccrualError::ClockRegression {
                last_accrual: 50,
                now: 49
            }
        );
    }

    #[test]
    fn ensure_default_impl() {
        let owner = HolderId([9; 20]);
        let stranger = HolderId([8; 20]);
        let auth = OnlyOwner(owner);
        assert!(auth.ensure(&owner, Capability::SetRate).is_ok());
        assert_eq!(
            auth.ensure(&stranger, Capability::MintAndBurn).unwrap_err(),
            AuthError::Unauthorized {
                holder: stranger,
                capability: Capability::MintAndBurn
            }
        );
    }

    #[test]
    fn traits_are_object_safe() {
        let calc: Box<dyn InterestCalculator> = Box::new(FlatBonus { bonus: 0 });
        let auth: Box<dyn Authorizer> = Box::new(OnlyOwner(HolderId::ZERO));
        assert_eq!(calc.interest_factor(0, 0).unwrap(), 1);
        assert!(auth.owner().is_zero());
    }
}
