//! JSON-RPC server for the Tide ledger node.
//!
//! Uses jsonrpsee 0.24. Holder ids travel as 40-character hex strings
//! (optional `0x` prefix); amounts and rates as JSON integers.
//!
//! Read methods are open. Mutating methods take the operator's admin token
//! as their first parameter and are rejected outright when the node has no
//! `rpc_admin_token` configured. Holder ids passed to them name the accounts
//! the operator acts on; they are never treated as proof of identity. Rate
//! changes are always made as the configured owner.

use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

use tide_core::error::{AccountError, AuthError, TideError, VaultError};
use tide_core::types::{Amount, HolderId, Rate, Timestamp, TransferAmount};
use tide_vault::RedeemAmount;

use crate::node::Node;

/// Invalid parameters (JSON-RPC standard code).
pub const INVALID_PARAMS: i32 = -32602;
/// Caller lacks the required capability.
pub const UNAUTHORIZED: i32 = -32001;
/// Balance, allowance or reserves too small for the request.
pub const INSUFFICIENT_FUNDS: i32 = -32002;
/// Any other rejected ledger operation.
pub const LEDGER_ERROR: i32 = -32000;

/// JSON representation of a holder's position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountJson {
    /// Holder id as hex.
    pub holder: String,
    /// Interest-adjusted balance at the node's current time.
    pub balance: Amount,
    /// Balance as stored, without unrealized interest.
    pub principal: Amount,
    /// Holder's locked-in interest rate.
    pub interest_rate: Rate,
}

/// JSON representation of a redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionJson {
    pub burned: Amount,
    pub paid: Amount,
}

/// JSON representation of node info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfoJson {
    /// Node clock (Unix seconds).
    pub timestamp: Timestamp,
    /// Global rate offered to new deposits.
    pub interest_rate: Rate,
    /// Sum of raw balances.
    pub total_supply: Amount,
    /// Asset held by the vault.
    pub reserves: Amount,
    pub vault: String,
    /// Whether mutating methods are enabled.
    pub admin_enabled: bool,
}

/// Parse a hex holder id.
pub fn parse_holder(hex_str: &str) -> Result<HolderId, ErrorObjectOwned> {
    hex_str
        .parse::<HolderId>()
        .map_err(|e| rpc_error(INVALID_PARAMS, &format!("invalid holder id: {e}")))
}

/// Byte-wise comparison whose duration does not depend on where the inputs
/// first differ.
fn token_matches(expected: &str, presented: &str) -> bool {
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Create a JSON-RPC error.
fn rpc_error(code: i32, msg: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.to_string(), None::<()>)
}

/// Map a ledger error to a JSON-RPC error code.
fn ledger_error(err: TideError) -> ErrorObjectOwned {
    let code = match &err {
        TideError::Auth(AuthError::Unauthorized { .. } | AuthError::NotOwner(_)) => UNAUTHORIZED,
        TideError::Account(
            AccountError::InsufficientBalance { .. } | AccountError::InsufficientAllowance { .. },
        )
        | TideError::Vault(VaultError::InsufficientReserves { .. }) => INSUFFICIENT_FUNDS,
        TideError::Vault(VaultError::ZeroDeposit) | TideError::Rate(_) => INVALID_PARAMS,
        _ => LEDGER_ERROR,
    };
    rpc_error(code, &err.to_string())
}

/// The Tide JSON-RPC interface.
#[rpc(server)]
pub trait TideRpc {
    /// Returns the global interest rate offered to new deposits.
    #[method(name = "getinterestrate")]
    async fn get_interest_rate(&self) -> Result<Rate, ErrorObjectOwned>;

    /// Returns a holder's interest-adjusted balance.
    #[method(name = "balanceof")]
    async fn balance_of(&self, holder: String) -> Result<Amount, ErrorObjectOwned>;

    /// Returns a holder's raw balance.
    #[method(name = "principalbalanceof")]
    async fn principal_balance_of(&self, holder: String) -> Result<Amount, ErrorObjectOwned>;

    /// Returns a holder's locked-in interest rate.
    #[method(name = "getuserinterestrate")]
    async fn get_user_interest_rate(&self, holder: String) -> Result<Rate, ErrorObjectOwned>;

    /// Returns balance, principal and rate for one holder.
    #[method(name = "getaccount")]
    async fn get_account(&self, holder: String) -> Result<AccountJson, ErrorObjectOwned>;

    /// Returns the raw total supply.
    #[method(name = "totalsupply")]
    async fn total_supply(&self) -> Result<Amount, ErrorObjectOwned>;

    /// Returns the vault's reserves.
    #[method(name = "getreserves")]
    async fn get_reserves(&self) -> Result<Amount, ErrorObjectOwned>;

    /// Credits `value` of received asset to `depositor`; returns the
    /// resulting raw balance. Admin only.
    #[method(name = "deposit")]
    async fn deposit(
        &self,
        admin_token: String,
        depositor: String,
        value: Amount,
    ) -> Result<Amount, ErrorObjectOwned>;

    /// Redeems `amount` (or everything if omitted) from `redeemer`. Admin only.
    #[method(name = "redeem")]
    async fn redeem(
        &self,
        admin_token: String,
        redeemer: String,
        amount: Option<Amount>,
    ) -> Result<RedemptionJson, ErrorObjectOwned>;

    /// Moves `amount` (or everything if omitted) from `from` to `to`;
    /// returns the amount moved. Admin only.
    #[method(name = "transfer")]
    async fn transfer(
        &self,
        admin_token: String,
        from: String,
        to: String,
        amount: Option<Amount>,
    ) -> Result<Amount, ErrorObjectOwned>;

    /// Lowers the global interest rate as the owner; returns the new rate.
    /// Admin only.
    #[method(name = "setinterestrate")]
    async fn set_interest_rate(
        &self,
        admin_token: String,
        rate: Rate,
    ) -> Result<Rate, ErrorObjectOwned>;

    /// Returns general node info.
    #[method(name = "getinfo")]
    async fn get_info(&self) -> Result<NodeInfoJson, ErrorObjectOwned>;
}

/// Implementation of the Tide JSON-RPC server.
pub struct RpcServerImpl {
    node: Arc<Node>,
}

impl RpcServerImpl {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    fn authorize(&self, presented: &str) -> Result<(), ErrorObjectOwned> {
        match self.node.config().rpc_admin_token.as_deref() {
            None => Err(rpc_error(UNAUTHORIZED, "mutating RPC methods are disabled")),
            Some(expected) if token_matches(expected, presented) => Ok(()),
            Some(_) => Err(rpc_error(UNAUTHORIZED, "invalid admin token")),
        }
    }
}

#[async_trait]
impl TideRpcServer for RpcServerImpl {
    async fn get_interest_rate(&self) -> Result<Rate, ErrorObjectOwned> {
        Ok(self.node.interest_rate())
    }

    async fn balance_of(&self, holder: String) -> Result<Amount, ErrorObjectOwned> {
        let holder = parse_holder(&holder)?;
        self.node.balance_of(&holder).map_err(ledger_error)
    }

    async fn principal_balance_of(&self, holder: String) -> Result<Amount, ErrorObjectOwned> {
        let holder = parse_holder(&holder)?;
        Ok(self.node.principal_balance_of(&holder))
    }

    async fn get_user_interest_rate(&self, holder: String) -> Result<Rate, ErrorObjectOwned> {
        let holder = parse_holder(&holder)?;
        Ok(self.node.user_interest_rate(&holder))
    }

    async fn get_account(&self, holder: String) -> Result<AccountJson, ErrorObjectOwned> {
        let id = parse_holder(&holder)?;
        Ok(AccountJson {
            holder: id.to_string(),
            balance: self.node.balance_of(&id).map_err(ledger_error)?,
            principal: self.node.principal_balance_of(&id),
            interest_rate: self.node.user_interest_rate(&id),
        })
    }

    async fn total_supply(&self) -> Result<Amount, ErrorObjectOwned> {
        Ok(self.node.total_supply())
    }

    async fn get_reserves(&self) -> Result<Amount, ErrorObjectOwned> {
        Ok(self.node.reserves())
    }

    async fn deposit(
        &self,
        admin_token: String,
        depositor: String,
        value: Amount,
    ) -> Result<Amount, ErrorObjectOwned> {
        self.authorize(&admin_token)?;
        let depositor = parse_holder(&depositor)?;
        self.node.deposit(&depositor, value).map_err(ledger_error)
    }

    async fn redeem(
        &self,
        admin_token: String,
        redeemer: String,
        amount: Option<Amount>,
    ) -> Result<RedemptionJson, ErrorObjectOwned> {
        self.authorize(&admin_token)?;
        let redeemer = parse_holder(&redeemer)?;
        let amount = amount.map_or(RedeemAmount::All, RedeemAmount::Exact);
        let redemption = self.node.redeem(&redeemer, amount).map_err(ledger_error)?;
        Ok(RedemptionJson {
            burned: redemption.burned,
            paid: redemption.paid,
        })
    }

    async fn transfer(
        &self,
        admin_token: String,
        from: String,
        to: String,
        amount: Option<Amount>,
    ) -> Result<Amount, ErrorObjectOwned> {
        self.authorize(&admin_token)?;
        let from = parse_holder(&from)?;
        let to = parse_holder(&to)?;
        let amount = amount.map_or(TransferAmount::All, TransferAmount::Exact);
        self.node.transfer(&from, &to, amount).map_err(ledger_error)
    }

    async fn set_interest_rate(
        &self,
        admin_token: String,
        rate: Rate,
    ) -> Result<Rate, ErrorObjectOwned> {
        self.authorize(&admin_token)?;
        let owner = self.node.config().owner;
        self.node.set_interest_rate(&owner, rate).map_err(ledger_error)
    }

    async fn get_info(&self) -> Result<NodeInfoJson, ErrorObjectOwned> {
        let info = self.node.info();
        let config = self.node.config();
        Ok(NodeInfoJson {
            timestamp: info.timestamp,
            interest_rate: info.interest_rate,
            total_supply: info.total_supply,
            reserves: info.reserves,
            vault: config.vault.to_string(),
            admin_enabled: config.rpc_admin_token.is_some(),
        })
    }
}

/// Start the JSON-RPC server on the given address.
///
/// Returns a [`ServerHandle`] that can be used to stop the server.
pub async fn start_rpc_server(addr: &str, node: Arc<Node>) -> Result<ServerHandle, TideError> {
    let server = Server::builder()
        .build(addr)
        .await
        .map_err(|e| TideError::Rpc(format!("RPC server error: {e}")))?;

    let rpc_impl = RpcServerImpl::new(node);
    Ok(server.start(rpc_impl.into_rpc()))
}
