//! Global interest rate policy.
//!
//! The global rate is the ceiling offered to new deposits. It may only be
//! lowered, and each lowering must be strict: a proposal equal to or above the
//! current value is rejected outright, never clamped. Holders that already
//! captured a rate keep it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tide_core::constants::DEFAULT_INTEREST_RATE;
use tide_core::error::RateError;
use tide_core::types::Rate;

/// A committed lowering of the global rate.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateChange {
    pub previous: Rate,
    pub current: Rate,
}

/// The process-wide interest rate offered to new deposits.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct RatePolicy {
    current: Rate,
}

impl RatePolicy {
    pub fn new(initial: Rate) -> Self {
        Self { current: initial }
    }

    /// The current global rate.
    pub fn rate(&self) -> Rate {
        self.current
    }

    /// Lower the global rate.
    ///
    /// # Errors
    ///
    /// - [`RateError::RateIncreaseRejected`] if `new_rate >= rate()`; the
    ///   policy is left unchanged
    pub fn set_rate(&mut self, new_rate: Rate) -> Result<RateChange, RateError> {
        if new_rate >= self.current {
            return Err(RateError::RateIncreaseRejected {
                current: self.current,
                proposed: new_rate,
            });
        }
        let change = RateChange {
            previous: self.current,
            current: new_rate,
        };
        self.current = new_rate;
        debug!(previous = change.previous, current = change.current, "rate_policy: lowered");
        Ok(change)
    }
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_INTEREST_RATE)
    }
}
