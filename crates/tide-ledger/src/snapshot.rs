//! Ledger snapshot persistence.
//!
//! A [`LedgerSnapshot`] holds the global rate, every holder's raw balance and
//! accrual record, all allowances, and the reserves of the vault minting
//! against the ledger. It is bincode-encoded with a leading format version and
//! written atomically (temp file + rename), so ledger and reserves are always
//! persisted as one consistent pair.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tide_core::error::TideError;
use tide_core::types::{AccrualRecord, Amount, HolderId, Rate, Timestamp};

/// Current on-disk format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct HolderSnapshot {
    pub holder: HolderId,
    pub raw_balance: Amount,
    pub record: AccrualRecord,
}

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct AllowanceSnapshot {
    pub owner: HolderId,
    pub spender: HolderId,
    pub amount: Amount,
}

/// Full ledger state at a point in time.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub interest_rate: Rate,
    /// Strictly sorted by holder.
    pub holders: Vec<HolderSnapshot>,
    /// Strictly sorted by `(owner, spender)`.
    pub allowances: Vec<AllowanceSnapshot>,
    /// Asset held by the vault, captured under the vault's lock.
    pub reserves: Amount,
}

impl LedgerSnapshot {
    pub fn new(
        interest_rate: Rate,
        holders: Vec<HolderSnapshot>,
        allowances: Vec<AllowanceSnapshot>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            interest_rate,
            holders,
            allowances,
            reserves: 0,
        }
    }

    /// Attach the vault's reserves.
    pub fn with_reserves(mut self, reserves: Amount) -> Self {
        self.reserves = reserves;
        self
    }

    /// Latest realization time recorded for any holder.
    pub fn latest_accrual(&self) -> Timestamp {
        self.holders
            .iter()
            .map(|entry| entry.record.last_accrual)
            .max()
            .unwrap_or(0)
    }

    /// Check the structural invariants a restore relies on.
    ///
    /// # Errors
    ///
    /// - unknown format version
    /// - holders or allowances not strictly sorted (duplicates included)
    /// - raw balances summing past `Amount::MAX`
    pub fn validate(&self) -> Result<(), TideError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(TideError::Snapshot(format!(
                "unsupported version {}",
                self.version
            )));
        }
        if let Some(pair) = self
            .holders
            .windows(2)
            .find(|pair| pair[0].holder >= pair[1].holder)
        {
            return Err(TideError::Snapshot(format!(
                "holders out of order at {}",
                pair[1].holder
            )));
        }
        if let Some(pair) = self.allowances.windows(2).find(|pair| {
            (pair[0].owner, pair[0].spender) >= (pair[1].owner, pair[1].spender)
        }) {
            return Err(TideError::Snapshot(format!(
                "allowances out of order at {} -> {}",
                pair[1].owner, pair[1].spender
            )));
        }
        if self.total_supply().is_none() {
            return Err(TideError::Snapshot("total supply overflow".to_string()));
        }
        Ok(())
    }

    /// Sum of all raw balances in the snapshot.
    pub fn total_supply(&self) -> Option<Amount> {
        self.holders
            .iter()
            .try_fold(0u64, |acc, entry| acc.checked_add(entry.raw_balance))
    }

    pub fn encode(&self) -> Result<Vec<u8>, TideError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TideError::Snapshot(format!("encode: {e}")))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TideError> {
        let (snapshot, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| TideError::Snapshot(format!("decode: {e}")))?;
        if read != bytes.len() {
            return Err(TideError::Snapshot(format!(
                "trailing bytes: decoded {read} of {}",
                bytes.len()
            )));
        }
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Write to `path`, replacing any previous snapshot atomically.
    pub fn save(&self, path: &Path) -> Result<(), TideError> {
        let bytes = self.encode()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)
            .map_err(|e| TideError::Snapshot(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, path)
            .map_err(|e| TideError::Snapshot(format!("rename to {}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = bytes.len(), holders = self.holders.len(), "snapshot: saved");
        Ok(())
    }

    /// Read from `path`. Returns `None` if no snapshot exists yet.
    pub fn load(path: &Path) -> Result<Option<Self>, TideError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TideError::Snapshot(format!("read {}: {e}", path.display())));
            }
        };
        Self::decode(&bytes).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::token::RebaseToken;
    use tide_core::access::AccessControl;
    use tide_core::constants::{DEFAULT_INTEREST_RATE, SECONDS_PER_HOUR};
    use tide_core::types::Capability;

    const OWNER: HolderId = HolderId([0x01; 20]);
    const MINTER: HolderId = HolderId([0x02; 20]);
    const ALICE: HolderId = HolderId([0x0A; 20]);
    const BOB: HolderId = HolderId([0x0B; 20]);

    fn acl() -> Arc<AccessControl> {
        let acl = AccessControl::new(OWNER);
        acl.grant(&OWNER, &MINTER, Capability::MintAndBurn).unwrap();
        Arc::new(acl)
    }

    fn populated() -> RebaseToken {
        let token = RebaseToken::new(DEFAULT_INTEREST_RATE, acl());
        token.mint(&MINTER, &ALICE, 100_000, DEFAULT_INTEREST_RATE, 1_000).unwrap();
        token.set_interest_rate(&OWNER, 40_000_000_000).unwrap();
        token.mint(&MINTER, &BOB, 5_000, 40_000_000_000, 2_000).unwrap();
        token.approve(&ALICE, &BOB, 777);
        token
    }

    #[test]
    fn snapshot_captures_state() {
        let snapshot = populated().snapshot();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.interest_rate, 40_000_000_000);
        assert_eq!(snapshot.holders.len(), 2);
        assert_eq!(snapshot.holders[0].holder, ALICE);
        assert_eq!(snapshot.holders[0].record.snapshot_rate, DEFAULT_INTEREST_RATE);
        assert_eq!(snapshot.holders[1].record.last_accrual, 2_000);
        assert_eq!(snapshot.total_supply(), Some(105_000));
        assert_eq!(snapshot.allowances.len(), 1);
    }

    #[test]
    fn restore_preserves_balances_and_rates() {
        let original = populated();
        let restored = RebaseToken::from_snapshot(&original.snapshot(), acl()).unwrap();
        let later = 2_000 + SECONDS_PER_HOUR;

        assert_eq!(restored.interest_rate(), original.interest_rate());
        assert_eq!(restored.total_supply(), original.total_supply());
        for holder in [ALICE, BOB] {
            assert_eq!(restored.account(&holder), original.account(&holder));
            assert_eq!(
                restored.balance_of(&holder, later).unwrap(),
                original.balance_of(&holder, later).unwrap()
            );
        }
        assert_eq!(restored.allowance(&ALICE, &BOB), 777);
    }

    #[test]
    fn encode_decode() {
        let snapshot = populated().snapshot();
        let bytes = snapshot.encode().unwrap();
        assert_eq!(LedgerSnapshot::decode(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            LedgerSnapshot::decode(&[0xFF, 0xFF, 0xFF]),
            Err(TideError::Snapshot(_))
        ));
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let mut snapshot = populated().snapshot();
        snapshot.version = SNAPSHOT_VERSION + 1;
        let bytes = snapshot.encode().unwrap();
        let err = LedgerSnapshot::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported version"));
    }

    #[test]
    fn decode_rejects_duplicate_holder() {
        let mut snapshot = populated().snapshot();
        let first = snapshot.holders[0].clone();
        snapshot.holders.insert(1, first);
        let bytes = snapshot.encode().unwrap();

        let err = LedgerSnapshot::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("holders out of order"));
        assert!(RebaseToken::from_snapshot(&snapshot, acl()).is_err());
    }

    #[test]
    fn decode_rejects_unsorted_holders() {
        let mut snapshot = populated().snapshot();
        snapshot.holders.reverse();
        assert!(LedgerSnapshot::decode(&snapshot.encode().unwrap()).is_err());
    }

    #[test]
    fn decode_rejects_duplicate_allowance() {
        let mut snapshot = populated().snapshot();
        let first = snapshot.allowances[0].clone();
        snapshot.allowances.push(first);
        let err = LedgerSnapshot::decode(&snapshot.encode().unwrap()).unwrap_err();
        assert!(err.to_string().contains("allowances out of order"));
    }

    #[test]
    fn allowances_written_sorted() {
        let token = populated();
        token.approve(&ALICE, &ALICE, 1);
        token.approve(&BOB, &ALICE, 2);
        let snapshot = token.snapshot();
        assert_eq!(snapshot.allowances.len(), 3);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn latest_accrual_and_reserves() {
        let snapshot = populated().snapshot().with_reserves(42);
        assert_eq!(snapshot.latest_accrual(), 2_000);
        assert_eq!(snapshot.reserves, 42);
        let decoded = LedgerSnapshot::decode(&snapshot.encode().unwrap()).unwrap();
        assert_eq!(decoded.reserves, 42);
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.snapshot");
        assert!(LedgerSnapshot::load(&path).unwrap().is_none());

        let snapshot = populated().snapshot();
        snapshot.save(&path).unwrap();
        assert_eq!(LedgerSnapshot::load(&path).unwrap(), Some(snapshot));
        assert!(!path.with_extension("tmp").exists());
    }
}
