//! In-memory raw balance ledger.
//!
//! [`MemoryAccountLedger`] implements [`AccountLedger`] over `HashMap`s with
//! no persistence; the ledger facade snapshots it when durability is needed.
//!
//! Not thread-safe on its own; the facade keeps it behind its state lock.

use std::collections::HashMap;

use crate::error::AccountError;
use crate::traits::AccountLedger;
use crate::types::{Amount, HolderId};

/// Raw balances, allowances and total supply held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountLedger {
    /// Holder → stored balance. Zero balances are removed.
    balances: HashMap<HolderId, Amount>,
    /// (owner, spender) → allowance. Zero allowances are removed.
    allowances: HashMap<(HolderId, HolderId), Amount>,
    /// Sum of `balances`.
    total_supply: Amount,
}

impl MemoryAccountLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of holders with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    fn set_balance(&mut self, holder: &HolderId, balance: Amount) {
        if balance == 0 {
            self.balances.remove(holder);
        } else {
            self.balances.insert(*holder, balance);
        }
    }
}

impl AccountLedger for MemoryAccountLedger {
    fn raw_balance_of(&self, holder: &HolderId) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn mint_raw(&mut self, holder: &HolderId, amount: Amount) -> Result<Amount, AccountError> {
        // Every balance is bounded by total supply, so one check covers both.
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(AccountError::SupplyOverflow)?;
        let balance = self.raw_balance_of(holder) + amount;
        self.total_supply = supply;
        self.set_balance(holder, balance);
        Ok(balance)
    }

    fn burn_raw(&mut self, holder: &HolderId, amount: Amount) -> Result<Amount, AccountError> {
        let have = self.raw_balance_of(holder);
        let balance = have
            .checked_sub(amount)
            .ok_or(AccountError::InsufficientBalance { have, need: amount })?;
        self.total_supply -= amount;
        self.set_balance(holder, balance);
        Ok(balance)
    }

    fn transfer_raw(
        &mut self,
        from: &HolderId,
        to: &HolderId,
        amount: Amount,
    ) -> Result<(Amount, Amount), AccountError> {
        let have = self.raw_balance_of(from);
        let from_balance = have
            .checked_sub(amount)
            .ok_or(AccountError::InsufficientBalance { have, need: amount })?;
        if from == to {
            return Ok((have, have));
        }
        let to_balance = self.raw_balance_of(to) + amount;
        self.set_balance(from, from_balance);
        self.set_balance(to, to_balance);
        Ok((from_balance, to_balance))
    }

    fn allowance(&self, owner: &HolderId, spender: &HolderId) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&mut self, owner: &HolderId, spender: &HolderId, amount: Amount) {
        if amount == 0 {
            self.allowances.remove(&(*owner, *spender));
        } else {
            self.allowances.insert((*owner, *spender), amount);
        }
    }

    fn spend_allowance(
        &mut self,
        owner: &HolderId,
        spender: &HolderId,
        amount: Amount,
    ) -> Result<Amount, AccountError> {
        let have = self.allowance(owner, spender);
        if have == Amount::MAX {
            return Ok(have);
        }
        let remaining = have
            .checked_sub(amount)
            .ok_or(AccountError::InsufficientAllowance { have, need: amount })?;
        self.approve(owner, spender, remaining);
        Ok(remaining)
    }

    fn holders(&self) -> Vec<(HolderId, Amount)> {
        let mut holders: Vec<_> = self.balances.iter().map(|(h, b)| (*h, *b)).collect();
        holders.sort_unstable();
        holders
    }

    fn allowances(&self) -> Vec<(HolderId, HolderId, Amount)> {
        let mut entries: Vec<_> = self
            .allowances
            .iter()
            .map(|((owner, spender), amount)| (*owner, *spender, *amount))
            .collect();
        entries.sort_unstable();
        entries
    }
}
