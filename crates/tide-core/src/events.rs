//! Observable ledger notifications.
//!
//! Events are published for audit and monitoring only; nothing in the ledger
//! reads them back.

use serde::{Deserialize, Serialize};

use crate::types::{Amount, HolderId, Rate};

/// A committed change to ledger state.
///
/// Balance-carrying variants report the raw balance *after* the change.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// The global interest rate was lowered.
    RateChanged { previous: Rate, current: Rate },
    /// Pending interest was minted into a holder's raw balance.
    InterestRealized {
        holder: HolderId,
        amount: Amount,
        raw_balance: Amount,
    },
    Minted {
        holder: HolderId,
        amount: Amount,
        raw_balance: Amount,
    },
    Burned {
        holder: HolderId,
        amount: Amount,
        raw_balance: Amount,
    },
    Transferred {
        from: HolderId,
        to: HolderId,
        amount: Amount,
        from_raw_balance: Amount,
        to_raw_balance: Amount,
    },
    Approval {
        owner: HolderId,
        spender: HolderId,
        amount: Amount,
    },
}

impl LedgerEvent {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateChanged { .. } => "rate_changed",
            Self::InterestRealized { .. } => "interest_realized",
            Self::Minted { .. } => "minted",
            Self::Burned { .. } => "burned",
            Self::Transferred { .. } => "transferred",
            Self::Approval { .. } => "approval",
        }
    }
}
