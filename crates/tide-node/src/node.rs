//! Node composition and background loop.
//!
//! The [`Node`] wires access control, the rebase ledger, the vault and a
//! clock together. Every call reads `now` from the node's clock once and
//! passes it down; the ledger itself never looks at time.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use tide_core::access::AccessControl;
use tide_core::clock::SystemClock;
use tide_core::error::TideError;
use tide_core::events::LedgerEvent;
use tide_core::traits::Clock;
use tide_core::types::{Amount, Capability, HolderId, Rate, Timestamp, TransferAmount};
use tide_ledger::{LedgerSnapshot, RebaseToken};
use tide_vault::{RedeemAmount, Redemption, Vault};

use crate::config::NodeConfig;

/// Point-in-time summary of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub timestamp: Timestamp,
    pub interest_rate: Rate,
    pub total_supply: Amount,
    pub reserves: Amount,
}

/// The ledger node.
pub struct Node {
    access: Arc<AccessControl>,
    token: Arc<RebaseToken>,
    vault: Vault,
    clock: Arc<dyn Clock>,
    config: NodeConfig,
}

impl Node {
    /// Create a node on the system clock, restoring persisted state from
    /// `config.data_dir` if present.
    ///
    /// The clock is floored at the latest restored accrual time, so a wall
    /// clock behind the snapshot cannot trip clock-regression errors.
    pub fn new(config: NodeConfig) -> Result<Arc<Self>, TideError> {
        config.validate()?;
        let snapshot = LedgerSnapshot::load(&config.snapshot_path())?;
        let floor = snapshot.as_ref().map_or(0, LedgerSnapshot::latest_accrual);
        Self::assemble(config, Arc::new(SystemClock::with_floor(floor)), snapshot)
    }

    /// Create a node with an explicit clock (tests drive a manual one).
    pub fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Arc<Self>, TideError> {
        config.validate()?;
        let snapshot = LedgerSnapshot::load(&config.snapshot_path())?;
        Self::assemble(config, clock, snapshot)
    }

    fn assemble(
        config: NodeConfig,
        clock: Arc<dyn Clock>,
        snapshot: Option<LedgerSnapshot>,
    ) -> Result<Arc<Self>, TideError> {
        let access = Arc::new(AccessControl::new(config.owner));
        access.grant(&config.owner, &config.vault, Capability::MintAndBurn)?;

        let reserves = snapshot.as_ref().map_or(0, |snapshot| snapshot.reserves);
        let token = match snapshot {
            Some(snapshot) => RebaseToken::from_snapshot(&snapshot, access.clone())?,
            None => {
                info!(
                    interest_rate = config.initial_interest_rate,
                    "no snapshot found, starting empty ledger"
                );
                RebaseToken::new(config.initial_interest_rate, access.clone())
            }
        };
        let token = Arc::new(token);

        let vault = Vault::with_reserves(config.vault, Arc::clone(&token), reserves);

        Ok(Arc::new(Self {
            access,
            token,
            vault,
            clock,
            config,
        }))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn access(&self) -> &Arc<AccessControl> {
        &self.access
    }

    pub fn token(&self) -> &Arc<RebaseToken> {
        &self.token
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // --- Query methods for RPC ---

    pub fn interest_rate(&self) -> Rate {
        self.token.interest_rate()
    }

    pub fn balance_of(&self, holder: &HolderId) -> Result<Amount, TideError> {
        self.token.balance_of(holder, self.now())
    }

    pub fn principal_balance_of(&self, holder: &HolderId) -> Amount {
        self.token.principal_balance_of(holder)
    }

    pub fn user_interest_rate(&self, holder: &HolderId) -> Rate {
        self.token.user_interest_rate(holder)
    }

    pub fn total_supply(&self) -> Amount {
        self.token.total_supply()
    }

    pub fn reserves(&self) -> Amount {
        self.vault.reserves()
    }

    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            timestamp: self.now(),
            interest_rate: self.interest_rate(),
            total_supply: self.total_supply(),
            reserves: self.reserves(),
        }
    }

    // --- Mutations ---

    pub fn deposit(&self, depositor: &HolderId, value: Amount) -> Result<Amount, TideError> {
        self.vault.deposit(depositor, value, self.now())
    }

    pub fn redeem(
        &self,
        redeemer: &HolderId,
        amount: RedeemAmount,
    ) -> Result<Redemption, TideError> {
        self.vault.redeem(redeemer, amount, self.now())
    }

    pub fn transfer(
        &self,
        sender: &HolderId,
        recipient: &HolderId,
        amount: TransferAmount,
    ) -> Result<Amount, TideError> {
        self.token.transfer(sender, recipient, amount, self.now())
    }

    pub fn set_interest_rate(&self, caller: &HolderId, new_rate: Rate) -> Result<Rate, TideError> {
        Ok(self.token.set_interest_rate(caller, new_rate)?.current)
    }

    /// Persist the ledger and the vault reserves, captured together, to
    /// `data_dir`.
    pub fn save_snapshot(&self) -> Result<(), TideError> {
        let snapshot = self.vault.snapshot();
        snapshot.save(&self.config.snapshot_path())?;
        debug!(
            holders = snapshot.holders.len(),
            reserves = snapshot.reserves,
            "node: snapshot written"
        );
        Ok(())
    }

    /// Run the node's background loop: log committed ledger events and write
    /// periodic snapshots. Returns when the event channel closes.
    pub async fn run(self: &Arc<Self>) {
        let mut events = self.token.subscribe();
        let period = Duration::from_secs(self.config.snapshot_interval_secs);
        let mut ticker = tokio::time::interval(period);
        // The first tick fires immediately.
        ticker.tick().await;

        info!(interval_secs = self.config.snapshot_interval_secs, "node loop started");

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => log_event(&event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "lagged behind on ledger events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("ledger event channel closed, shutting down");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.save_snapshot() {
                        warn!("periodic snapshot failed: {e}");
                    }
                }
            }
        }
    }
}

fn log_event(event: &LedgerEvent) {
    match event {
        LedgerEvent::RateChanged { previous, current } => {
            info!(previous, current, "event: {}", event.kind());
        }
        LedgerEvent::InterestRealized { holder, amount, .. }
        | LedgerEvent::Minted { holder, amount, .. }
        | LedgerEvent::Burned { holder, amount, .. } => {
            debug!(%holder, amount, "event: {}", event.kind());
        }
        LedgerEvent::Transferred { from, to, amount, .. } => {
            debug!(%from, %to, amount, "event: {}", event.kind());
        }
        LedgerEvent::Approval { owner, spender, amount } => {
            debug!(%owner, %spender, amount, "event: {}", event.kind());
        }
    }
}
