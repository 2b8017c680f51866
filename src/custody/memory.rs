//! In-memory custody backed by a concurrent balance map

use super::TokenCustody;
use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use dashmap::DashMap;
use ethers::types::{Address, U256};
use tracing::debug;

/// Balance table for a single token
#[derive(Debug, Default)]
pub struct InMemoryCustody {
    balances: DashMap<Address, U256>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create custody pre-funded with the given balances.
    ///
    /// Repeated accounts accumulate.
    pub fn with_balances(
        balances: impl IntoIterator<Item = (Address, U256)>,
    ) -> BridgeResult<Self> {
        let custody = Self::new();
        for (account, amount) in balances {
            custody.mint(account, amount)?;
        }
        Ok(custody)
    }

    /// Issue new value to `account` (genesis funding and tests)
    pub fn mint(&self, account: Address, amount: U256) -> BridgeResult<()> {
        let mut balance = self.balances.entry(account).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| BridgeError::Custody(format!("balance overflow for {:?}", account)))?;
        Ok(())
    }

    /// Sum of all balances held
    pub fn total_supply(&self) -> U256 {
        self.balances
            .iter()
            .fold(U256::zero(), |acc, entry| acc.saturating_add(*entry.value()))
    }
}

#[async_trait]
impl TokenCustody for InMemoryCustody {
    async fn debit(&self, account: Address, amount: U256) -> BridgeResult<()> {
        let mut balance = self.balances.entry(account).or_default();
        if *balance < amount {
            return Err(BridgeError::InsufficientBalance {
                account,
                have: *balance,
                need: amount,
            });
        }
        *balance -= amount;
        debug!("Debited {} from {:?}", amount, account);
        Ok(())
    }

    async fn credit(&self, account: Address, amount: U256) -> BridgeResult<()> {
        self.mint(account, amount)?;
        debug!("Credited {} to {:?}", amount, account);
        Ok(())
    }

    async fn balance_of(&self, account: Address) -> BridgeResult<U256> {
        Ok(self
            .balances
            .get(&account)
            .map(|b| *b.value())
            .unwrap_or_default())
    }
}
