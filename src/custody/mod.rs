//! Token custody - the value-holding collaborator
//!
//! The bridge never stores balances itself. It debits senders on swap and
//! credits recipients on redeem through [`TokenCustody`], which may be backed
//! by a token contract, a database, or the in-memory ledger used by the node.

mod memory;

pub use memory::InMemoryCustody;

use crate::error::BridgeResult;

use async_trait::async_trait;
use ethers::types::{Address, U256};

/// Contract consumed by the bridge for moving value
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenCustody: Send + Sync {
    /// Remove `amount` from `account`.
    ///
    /// Fails with `InsufficientBalance` when the account holds less than
    /// `amount`; the balance must be untouched in that case.
    async fn debit(&self, account: Address, amount: U256) -> BridgeResult<()>;

    /// Add `amount` to `account`
    async fn credit(&self, account: Address, amount: U256) -> BridgeResult<()>;

    /// Current balance of `account`
    async fn balance_of(&self, account: Address) -> BridgeResult<U256>;
}
