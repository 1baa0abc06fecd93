//! The rebase token: mutation gateway and balance views.
//!
//! Holder lifecycle is implicit: an unknown holder becomes active on its first
//! inbound mint or transfer, may drain back to a zero raw balance, and adopts a
//! fresh snapshot rate when value next arrives.
//!
//! Every mutating call runs as one unit under the state lock:
//! 1. authorization (before the lock), clock and balance/allowance/overflow
//!    checks against a read-only preview, so a rejected call changes nothing;
//! 2. realization of pending interest for each affected holder;
//! 3. the requested raw-balance change;
//! 4. event publication, in commit order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};

use tide_accrual::engine::{realize_interest, AccrualEngine};
use tide_accrual::rate::{RateChange, RatePolicy};
use tide_core::account_ledger::MemoryAccountLedger;
use tide_core::constants::EVENT_CHANNEL_CAPACITY;
use tide_core::error::{AccountError, TideError};
use tide_core::events::LedgerEvent;
use tide_core::traits::{AccountLedger, Authorizer, InterestCalculator};
use tide_core::types::{
    AccrualRecord, Amount, Capability, HolderAccount, HolderId, Rate, Timestamp, TransferAmount,
};

use crate::snapshot::{AllowanceSnapshot, HolderSnapshot, LedgerSnapshot};

/// Everything guarded by the token's lock.
struct TokenState {
    accounts: Box<dyn AccountLedger>,
    records: HashMap<HolderId, AccrualRecord>,
    policy: RatePolicy,
}

impl TokenState {
    fn account(&self, holder: &HolderId) -> HolderAccount {
        let record = self.records.get(holder).copied().unwrap_or_default();
        HolderAccount::new(self.accounts.raw_balance_of(holder), record)
    }

    /// Current account and its accrued balance at `now`, without mutating.
    fn preview(
        &self,
        calculator: &dyn InterestCalculator,
        holder: &HolderId,
        now: Timestamp,
    ) -> Result<(HolderAccount, Amount), TideError> {
        let account = self.account(holder);
        let accrued = calculator.accrued_balance(&account, now)?;
        Ok((account, accrued))
    }

    /// Fail unless total supply can absorb every amount in `issuance`.
    fn ensure_headroom(&self, issuance: &[Amount]) -> Result<(), AccountError> {
        issuance
            .iter()
            .try_fold(self.accounts.total_supply(), |supply, amount| {
                supply.checked_add(*amount)
            })
            .map(|_| ())
            .ok_or(AccountError::SupplyOverflow)
    }

    fn realize(
        &mut self,
        calculator: &dyn InterestCalculator,
        holder: &HolderId,
        now: Timestamp,
        events: &mut Vec<LedgerEvent>,
    ) -> Result<HolderAccount, TideError> {
        let mut account = self.account(holder);
        let minted = realize_interest(calculator, holder, &mut account, &mut *self.accounts, now)?;
        // Empty holders without a record stay untracked.
        if account.raw_balance > 0 || self.records.contains_key(holder) {
            self.records.insert(*holder, account.record());
        }
        if minted > 0 {
            debug!(%holder, minted, raw_balance = account.raw_balance, "ledger: interest realized");
            events.push(LedgerEvent::InterestRealized {
                holder: *holder,
                amount: minted,
                raw_balance: account.raw_balance,
            });
        }
        Ok(account)
    }
}

/// Interest-bearing ledger with lazy, per-holder linear accrual.
pub struct RebaseToken {
    state: Mutex<TokenState>,
    calculator: Arc<dyn InterestCalculator>,
    authorizer: Arc<dyn Authorizer>,
    events: broadcast::Sender<LedgerEvent>,
}

impl RebaseToken {
    /// Create an empty token backed by the in-memory account ledger and the
    /// production accrual engine.
    pub fn new(initial_rate: Rate, authorizer: Arc<dyn Authorizer>) -> Self {
        Self::with_parts(
            Box::new(MemoryAccountLedger::new()),
            Arc::new(AccrualEngine::new()),
            authorizer,
            RatePolicy::new(initial_rate),
        )
    }

    /// Assemble a token from explicit collaborators.
    pub fn with_parts(
        accounts: Box<dyn AccountLedger>,
        calculator: Arc<dyn InterestCalculator>,
        authorizer: Arc<dyn Authorizer>,
        policy: RatePolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(TokenState {
                accounts,
                records: HashMap::new(),
                policy,
            }),
            calculator,
            authorizer,
            events,
        }
    }

    /// Rebuild a token from a snapshot, using the in-memory account ledger.
    pub fn from_snapshot(
        snapshot: &LedgerSnapshot,
        authorizer: Arc<dyn Authorizer>,
    ) -> Result<Self, TideError> {
        snapshot.validate()?;
        let mut accounts = MemoryAccountLedger::new();
        let mut records = HashMap::with_capacity(snapshot.holders.len());
        for entry in &snapshot.holders {
            if entry.raw_balance > 0 {
                accounts.mint_raw(&entry.holder, entry.raw_balance)?;
            }
            records.insert(entry.holder, entry.record);
        }
        for entry in &snapshot.allowances {
            accounts.approve(&entry.owner, &entry.spender, entry.amount);
        }

        let token = Self::with_parts(
            Box::new(accounts),
            Arc::new(AccrualEngine::new()),
            authorizer,
            RatePolicy::new(snapshot.interest_rate),
        );
        token.state.lock().records = records;
        info!(
            holders = snapshot.holders.len(),
            interest_rate = snapshot.interest_rate,
            "ledger: restored from snapshot"
        );
        Ok(token)
    }

    /// Capture the full ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.lock();
        let mut holders: Vec<HolderSnapshot> = state
            .records
            .iter()
            .map(|(holder, record)| HolderSnapshot {
                holder: *holder,
                raw_balance: state.accounts.raw_balance_of(holder),
                record: *record,
            })
            .collect();
        // Raw balances without a record (e.g. seeded directly into the
        // account ledger) still need to survive a restore.
        for (holder, raw_balance) in state.accounts.holders() {
            if !state.records.contains_key(&holder) {
                holders.push(HolderSnapshot {
                    holder,
                    raw_balance,
                    record: AccrualRecord::default(),
                });
            }
        }
        holders.sort_unstable_by_key(|entry| entry.holder);

        let mut allowances: Vec<AllowanceSnapshot> = state
            .accounts
            .allowances()
            .into_iter()
            .map(|(owner, spender, amount)| AllowanceSnapshot {
                owner,
                spender,
                amount,
            })
            .collect();
        allowances.sort_unstable_by_key(|entry| (entry.owner, entry.spender));

        LedgerSnapshot::new(state.policy.rate(), holders, allowances)
    }

    /// Subscribe to committed ledger events.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// The authorizer this token checks capabilities against.
    pub fn authorizer(&self) -> &Arc<dyn Authorizer> {
        &self.authorizer
    }

    fn publish(&self, events: Vec<LedgerEvent>) {
        for event in events {
            // No subscribers is not an error.
            let _ = self.events.send(event);
        }
    }

    // ------------------------------------------------------------------
    // Rate policy
    // ------------------------------------------------------------------

    /// The global rate offered to new deposits.
    pub fn interest_rate(&self) -> Rate {
        self.state.lock().policy.rate()
    }

    /// Lower the global rate. Requires [`Capability::SetRate`].
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthorized`](tide_core::error::AuthError::Unauthorized) if `caller` lacks the capability
    /// - [`RateError::RateIncreaseRejected`](tide_core::error::RateError::RateIncreaseRejected) if `new_rate` is not strictly lower
    pub fn set_interest_rate(
        &self,
        caller: &HolderId,
        new_rate: Rate,
    ) -> Result<RateChange, TideError> {
        self.authorizer.ensure(caller, Capability::SetRate)?;
        let mut state = self.state.lock();
        let change = state.policy.set_rate(new_rate)?;
        info!(%caller, previous = change.previous, current = change.current, "ledger: interest rate lowered");
        self.publish(vec![LedgerEvent::RateChanged {
            previous: change.previous,
            current: change.current,
        }]);
        Ok(change)
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Interest-adjusted balance at `now`. Never realizes interest.
    pub fn balance_of(&self, holder: &HolderId, now: Timestamp) -> Result<Amount, TideError> {
        let state = self.state.lock();
        let (_, accrued) = state.preview(self.calculator.as_ref(), holder, now)?;
        Ok(accrued)
    }

    /// Stored balance, excluding unrealized interest.
    pub fn principal_balance_of(&self, holder: &HolderId) -> Amount {
        self.state.lock().accounts.raw_balance_of(holder)
    }

    /// The rate captured for `holder` (zero for unknown holders).
    pub fn user_interest_rate(&self, holder: &HolderId) -> Rate {
        self.state
            .lock()
            .records
            .get(holder)
            .map_or(0, |record| record.snapshot_rate)
    }

    /// When `holder`'s interest was last realized, if ever.
    pub fn last_accrual(&self, holder: &HolderId) -> Option<Timestamp> {
        self.state
            .lock()
            .records
            .get(holder)
            .map(|record| record.last_accrual)
    }

    /// Joined raw balance and accrual record for `holder`.
    pub fn account(&self, holder: &HolderId) -> HolderAccount {
        self.state.lock().account(holder)
    }

    /// Sum of raw balances. Unrealized interest is not included.
    pub fn total_supply(&self) -> Amount {
        self.state.lock().accounts.total_supply()
    }

    pub fn allowance(&self, owner: &HolderId, spender: &HolderId) -> Amount {
        self.state.lock().accounts.allowance(owner, spender)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Issue `amount` to `to`. Requires [`Capability::MintAndBurn`].
    ///
    /// Realizes `to`'s pending interest, then overwrites its snapshot rate with
    /// `rate` (callers pass the current global rate), then credits `amount`.
    /// Returns `to`'s resulting raw balance.
    pub fn mint(
        &self,
        caller: &HolderId,
        to: &HolderId,
        amount: Amount,
        rate: Rate,
        now: Timestamp,
    ) -> Result<Amount, TideError> {
        self.authorizer.ensure(caller, Capability::MintAndBurn)?;
        let calculator = self.calculator.as_ref();
        let mut state = self.state.lock();

        let (account, accrued) = state.preview(calculator, to, now)?;
        state.ensure_headroom(&[accrued - account.raw_balance, amount])?;

        let mut events = Vec::new();
        state.realize(calculator, to, now, &mut events)?;
        state.records.insert(
            *to,
            AccrualRecord {
                snapshot_rate: rate,
                last_accrual: now,
            },
        );
        let raw_balance = state.accounts.mint_raw(to, amount)?;

        debug!(%caller, %to, amount, rate, raw_balance, "ledger: minted");
        events.push(LedgerEvent::Minted {
            holder: *to,
            amount,
            raw_balance,
        });
        self.publish(events);
        Ok(raw_balance)
    }

    /// Destroy `amount` of `from`'s balance. Requires [`Capability::MintAndBurn`].
    ///
    /// `amount` is a literal value; callers wanting "everything" resolve it via
    /// [`balance_of`](Self::balance_of) first. Returns `from`'s resulting raw
    /// balance.
    pub fn burn(
        &self,
        caller: &HolderId,
        from: &HolderId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Amount, TideError> {
        self.authorizer.ensure(caller, Capability::MintAndBurn)?;
        let calculator = self.calculator.as_ref();
        let mut state = self.state.lock();

        let (account, accrued) = state.preview(calculator, from, now)?;
        if amount > accrued {
            return Err(AccountError::InsufficientBalance {
                have: accrued,
                need: amount,
            }
            .into());
        }
        state.ensure_headroom(&[accrued - account.raw_balance])?;

        let mut events = Vec::new();
        state.realize(calculator, from, now, &mut events)?;
        let raw_balance = state.accounts.burn_raw(from, amount)?;

        debug!(%caller, %from, amount, raw_balance, "ledger: burned");
        events.push(LedgerEvent::Burned {
            holder: *from,
            amount,
            raw_balance,
        });
        self.publish(events);
        Ok(raw_balance)
    }

    /// Move value from `sender` to `recipient`. Returns the amount moved.
    ///
    /// A recipient whose balance is exactly zero adopts `sender`'s snapshot
    /// rate; a funded recipient keeps its own.
    pub fn transfer(
        &self,
        sender: &HolderId,
        recipient: &HolderId,
        amount: impl Into<TransferAmount>,
        now: Timestamp,
    ) -> Result<Amount, TideError> {
        self.move_balance(None, sender, recipient, amount.into(), now)
    }

    /// Like [`transfer`](Self::transfer), spending `spender`'s allowance over
    /// `sender`'s balance.
    pub fn transfer_from(
        &self,
        spender: &HolderId,
        sender: &HolderId,
        recipient: &HolderId,
        amount: impl Into<TransferAmount>,
        now: Timestamp,
    ) -> Result<Amount, TideError> {
        self.move_balance(Some(spender), sender, recipient, amount.into(), now)
    }

    /// Let `spender` move up to `amount` of `owner`'s balance.
    /// `Amount::MAX` grants an allowance that is never consumed.
    pub fn approve(&self, owner: &HolderId, spender: &HolderId, amount: Amount) {
        let mut state = self.state.lock();
        state.accounts.approve(owner, spender, amount);
        debug!(%owner, %spender, amount, "ledger: approval");
        self.publish(vec![LedgerEvent::Approval {
            owner: *owner,
            spender: *spender,
            amount,
        }]);
    }

    fn move_balance(
        &self,
        spender: Option<&HolderId>,
        sender: &HolderId,
        recipient: &HolderId,
        amount: TransferAmount,
        now: Timestamp,
    ) -> Result<Amount, TideError> {
        let calculator = self.calculator.as_ref();
        let mut state = self.state.lock();
        let self_transfer = sender == recipient;

        let (sender_account, sender_accrued) = state.preview(calculator, sender, now)?;
        let (recipient_account, recipient_accrued) = state.preview(calculator, recipient, now)?;

        let resolved = match amount {
            TransferAmount::Exact(value) => value,
            TransferAmount::All => sender_accrued,
        };
        if resolved > sender_accrued {
            return Err(AccountError::InsufficientBalance {
                have: sender_accrued,
                need: resolved,
            }
            .into());
        }
        if let Some(spender) = spender {
            let have = state.accounts.allowance(sender, spender);
            if have != Amount::MAX && have < resolved {
                return Err(AccountError::InsufficientAllowance {
                    have,
                    need: resolved,
                }
                .into());
            }
        }
        let recipient_pending = if self_transfer {
            0
        } else {
            recipient_accrued - recipient_account.raw_balance
        };
        state.ensure_headroom(&[sender_accrued - sender_account.raw_balance, recipient_pending])?;

        let mut events = Vec::new();
        let sender_account = state.realize(calculator, sender, now, &mut events)?;
        if !self_transfer {
            let recipient_account = state.realize(calculator, recipient, now, &mut events)?;
            let tracked = resolved > 0 || state.records.contains_key(recipient);
            if recipient_account.raw_balance == 0 && tracked {
                state.records.insert(
                    *recipient,
                    AccrualRecord {
                        snapshot_rate: sender_account.snapshot_rate,
                        last_accrual: now,
                    },
                );
                debug!(%recipient, rate = sender_account.snapshot_rate, "ledger: recipient adopted sender rate");
            }
        }
        if let Some(spender) = spender {
            state.accounts.spend_allowance(sender, spender, resolved)?;
        }
        let (from_raw_balance, to_raw_balance) =
            state.accounts.transfer_raw(sender, recipient, resolved)?;

        debug!(%sender, %recipient, amount = resolved, from_raw_balance, to_raw_balance, "ledger: transferred");
        events.push(LedgerEvent::Transferred {
            from: *sender,
            to: *recipient,
            amount: resolved,
            from_raw_balance,
            to_raw_balance,
        });
        self.publish(events);
        Ok(resolved)
    }
}
