//! Core ledger types: holder identities, accounts, capabilities.
//!
//! All balances are token units in `u64`; interest rates are per-second
//! fixed-point values over [`RATE_PRECISION`](crate::constants::RATE_PRECISION).
//! Timestamps are Unix seconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::HOLDER_ID_LEN;
use crate::error::HolderIdError;

/// Token units.
pub type Amount = u64;

/// Per-second interest rate, fixed-point over `RATE_PRECISION`.
pub type Rate = u64;

/// Unix seconds.
pub type Timestamp = u64;

/// A 20-byte holder identity.
///
/// Rendered as 40 lowercase hex characters. Parsing accepts an optional
/// `0x` prefix and either case.
///
/// # Examples
///
/// ```
/// use tide_core::types::HolderId;
/// let id: HolderId = "0x0101010101010101010101010101010101010101".parse().unwrap();
/// assert_eq!(id, HolderId([1u8; 20]));
/// assert_eq!(id.to_string(), "01".repeat(20));
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct HolderId(pub [u8; HOLDER_ID_LEN]);

impl HolderId {
    /// The all-zero identity.
    pub const ZERO: Self = Self([0u8; HOLDER_ID_LEN]);

    pub fn from_bytes(bytes: [u8; HOLDER_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HOLDER_ID_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HOLDER_ID_LEN]
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for HolderId {
    type Err = HolderIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != HOLDER_ID_LEN * 2 {
            return Err(HolderIdError::InvalidLength(digits.len()));
        }
        let bytes = hex::decode(digits).map_err(|_| HolderIdError::InvalidHex)?;
        let arr: [u8; HOLDER_ID_LEN] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| HolderIdError::InvalidLength(v.len() * 2))?;
        Ok(Self(arr))
    }
}

impl From<[u8; HOLDER_ID_LEN]> for HolderId {
    fn from(bytes: [u8; HOLDER_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for HolderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HolderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A permission checked by the ledger before privileged mutations.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// May mint and burn ledger shares (granted to the vault).
    MintAndBurn,
    /// May lower the global interest rate.
    SetRate,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MintAndBurn => f.write_str("mint-and-burn"),
            Self::SetRate => f.write_str("set-rate"),
        }
    }
}

/// Per-holder accrual bookkeeping kept by the ledger facade.
///
/// The raw balance itself lives in the account ledger; this record holds the
/// two values the interest calculation needs on top of it.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccrualRecord {
    /// Interest rate captured for this holder.
    pub snapshot_rate: Rate,
    /// Last time pending interest was realized into the raw balance.
    pub last_accrual: Timestamp,
}

/// Joined view of a holder: raw balance plus its accrual record.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct HolderAccount {
    /// Stored, non-accrued token units.
    pub raw_balance: Amount,
    /// Interest rate captured for this holder.
    pub snapshot_rate: Rate,
    /// Last time pending interest was realized into the raw balance.
    pub last_accrual: Timestamp,
}

impl HolderAccount {
    pub fn new(raw_balance: Amount, record: AccrualRecord) -> Self {
        Self {
            raw_balance,
            snapshot_rate: record.snapshot_rate,
            last_accrual: record.last_accrual,
        }
    }

    /// The accrual half of this account.
    pub fn record(&self) -> AccrualRecord {
        AccrualRecord {
            snapshot_rate: self.snapshot_rate,
            last_accrual: self.last_accrual,
        }
    }
}

/// Amount argument for transfers.
///
/// `All` moves the sender's whole balance as of the transfer timestamp,
/// including interest realized by the transfer itself.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferAmount {
    Exact(Amount),
    All,
}

impl From<Amount> for TransferAmount {
    fn from(amount: Amount) -> Self {
        Self::Exact(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holder_id_display_is_lower_hex() {
        let id = HolderId([0xAB; 20]);
        assert_eq!(id.to_string(), "ab".repeat(20));
    }

    #[test]
    fn holder_id_parse_plain_and_prefixed() {
        let plain: HolderId = "cd".repeat(20).parse().unwrap();
        let prefixed: HolderId = format!("0x{}", "CD".repeat(20)).parse().unwrap();
        assert_eq!(plain, HolderId([0xCD; 20]));
        assert_eq!(plain, prefixed);
    }

    #[test]
    fn holder_id_parse_wrong_length() {
        let err = "abcd".parse::<HolderId>().unwrap_err();
        assert_eq!(err, HolderIdError::InvalidLength(4));
    }

    #[test]
    fn holder_id_parse_invalid_hex() {
        let err = "zz".repeat(20).parse::<HolderId>().unwrap_err();
        assert_eq!(err, HolderIdError::InvalidHex);
    }

    #[test]
    fn holder_id_serde_as_hex_string() {
        let id = HolderId([0x07; 20]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(20)));
        let back: HolderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn holder_id_zero() {
        assert!(HolderId::ZERO.is_zero());
        assert!(!HolderId([1; 20]).is_zero());
    }

    #[test]
    fn capability_display() {
        assert_eq!(Capability::MintAndBurn.to_string(), "mint-and-burn");
        assert_eq!(Capability::SetRate.to_string(), "set-rate");
    }

    #[test]
    fn account_record_split() {
        let record = AccrualRecord {
            snapshot_rate: 42,
            last_accrual: 1_000,
        };
        let account = HolderAccount::new(500, record);
        assert_eq!(account.raw_balance, 500);
        assert_eq!(account.record(), record);
    }

    #[test]
    fn transfer_amount_from_amount() {
        assert_eq!(TransferAmount::from(7), TransferAmount::Exact(7));
    }
}
