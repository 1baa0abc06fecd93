//! Accrual engine implementing the [`InterestCalculator`] trait.
//!
//! Interest is simple (linear) per holder: the growth factor is
//! `RATE_PRECISION + rate * elapsed` and the accrued balance is
//! `raw * factor / RATE_PRECISION`, truncated toward zero.
//! All arithmetic is integer-only with u128 intermediates for overflow safety.

use tide_core::constants::RATE_PRECISION;
use tide_core::error::{AccrualError, TideError};
use tide_core::traits::{AccountLedger, InterestCalculator};
use tide_core::types::{Amount, HolderAccount, HolderId, Rate, Timestamp};

/// The production interest calculator.
#[derive(Debug, Clone, Default)]
pub struct AccrualEngine;

impl AccrualEngine {
    /// Create a new AccrualEngine.
    pub fn new() -> Self {
        Self
    }
}

/// Seconds since the last accrual. A `now` earlier than `last_accrual` is
/// rejected, never clamped.
fn elapsed_since(last_accrual: Timestamp, now: Timestamp) -> Result<u64, AccrualError> {
    now.checked_sub(last_accrual)
        .ok_or(AccrualError::ClockRegression { last_accrual, now })
}

impl InterestCalculator for AccrualEngine {
    fn interest_factor(&self, rate: Rate, elapsed: u64) -> Result<u128, AccrualError> {
        (rate as u128)
            .checked_mul(elapsed as u128)
            .and_then(|growth| growth.checked_add(RATE_PRECISION as u128))
            .ok_or(AccrualError::ArithmeticOverflow)
    }

    fn accrued_balance(
        &self,
        account: &HolderAccount,
        now: Timestamp,
    ) -> Result<Amount, AccrualError> {
        let elapsed = elapsed_since(account.last_accrual, now)?;
        if account.raw_balance == 0 || elapsed == 0 || account.snapshot_rate == 0 {
            return Ok(account.raw_balance);
        }

        let factor = self.interest_factor(account.snapshot_rate, elapsed)?;

        // accrued = raw * factor / PRECISION
        let accrued = (account.raw_balance as u128)
            .checked_mul(factor)
            .ok_or(AccrualError::ArithmeticOverflow)?
            / RATE_PRECISION as u128;

        Amount::try_from(accrued).map_err(|_| AccrualError::ArithmeticOverflow)
    }
}

/// Mint a holder's pending interest into its raw balance.
///
/// Sets `account.raw_balance` to the ledger's post-mint balance and
/// `account.last_accrual` to `now`, returning the amount minted. A zero
/// pending amount skips the ledger but still advances the timestamp, so a
/// second call at the same `now` always mints nothing.
///
/// The caller writes `account.record()` back to its accrual table.
pub fn realize_interest(
    calculator: &dyn InterestCalculator,
    holder: &HolderId,
    account: &mut HolderAccount,
    ledger: &mut dyn AccountLedger,
    now: Timestamp,
) -> Result<Amount, TideError> {
    let pending = calculator.pending_interest(account, now)?;
    if pending > 0 {
        account.raw_balance = ledger.mint_raw(holder, pending)?;
    }
    account.last_accrual = now;
    Ok(pending)
}
