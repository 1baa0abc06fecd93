//! Error types for the Tide ledger.
use thiserror::Error;

use crate::types::{Amount, Capability, HolderId, Rate, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateError {
    #[error("rate increase rejected: current {current}, proposed {proposed}")] RateIncreaseRejected { current: Rate, proposed: Rate },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccrualError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("clock regression: last accrual {last_accrual}, now {now}")] ClockRegression { last_accrual: Timestamp, now: Timestamp },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: Amount, need: Amount },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: Amount, need: Amount },
    #[error("total supply overflow")] SupplyOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{holder} lacks capability {capability}")] Unauthorized { holder: HolderId, capability: Capability },
    #[error("{0} is not the owner")] NotOwner(HolderId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("zero-value deposit")] ZeroDeposit,
    #[error("insufficient reserves: have {have}, need {need}")] InsufficientReserves { have: Amount, need: Amount },
    #[error("reserve overflow")] ReserveOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HolderIdError {
    #[error("invalid hex")] InvalidHex,
    #[error("invalid length: {0} hex characters")] InvalidLength(usize),
}

#[derive(Error, Debug)]
pub enum TideError {
    #[error(transparent)] Rate(#[from] RateError),
    #[error(transparent)] Accrual(#[from] AccrualError),
    #[error(transparent)] Account(#[from] AccountError),
    #[error(transparent)] Auth(#[from] AuthError),
    #[error(transparent)] Vault(#[from] VaultError),
    #[error(transparent)] HolderId(#[from] HolderIdError),
    #[error("snapshot: {0}")] Snapshot(String),
    #[error("config: {0}")] Config(String),
    #[error("rpc: {0}")] Rpc(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = RateError::RateIncreaseRejected { current: 5, proposed: 6 };
        assert_eq!(err.to_string(), "rate increase rejected: current 5, proposed 6");

        let err = AuthError::Unauthorized {
            holder: HolderId([0x01; 20]),
            capability: Capability::MintAndBurn,
        };
        assert!(err.to_string().ends_with("lacks capability mint-and-burn"));
    }

    #[test]
    fn tide_error_is_transparent() {
        let err: TideError = AccountError::InsufficientBalance { have: 1, need: 2 }.into();
        assert_eq!(err.to_string(), "insufficient balance: have 1, need 2");
        assert!(matches!(
            err,
            TideError::Account(AccountError::InsufficientBalance { .. })
        ));
    }
}
