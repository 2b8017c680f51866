//! Administrator-controlled registry of supported destination chains

use crate::error::{BridgeError, BridgeResult};

use ethers::types::Address;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Status of a single destination chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub enabled: bool,
}

/// Allow-list of destination chain identifiers
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    /// Identity allowed to mutate the registry
    admin: Address,
    /// Known chains; absent entries are disabled
    chains: BTreeMap<u64, ChainConfig>,
}

impl ChainRegistry {
    /// Create an empty registry administered by `admin`
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            chains: BTreeMap::new(),
        }
    }

    /// Get the administrator identity
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Enable a chain. Returns whether the status changed.
    pub fn enable_chain(&mut self, caller: Address, chain_id: u64) -> BridgeResult<bool> {
        self.set_status(caller, chain_id, true)
    }

    /// Disable a chain. Returns whether the status changed.
    pub fn disable_chain(&mut self, caller: Address, chain_id: u64) -> BridgeResult<bool> {
        self.set_status(caller, chain_id, false)
    }

    /// Check whether swaps towards `chain_id` are accepted
    pub fn is_enabled(&self, chain_id: u64) -> bool {
        self.chains
            .get(&chain_id)
            .map(|c| c.enabled)
            .unwrap_or(false)
    }

    /// Get all currently enabled chain IDs, ascending
    pub fn enabled_chains(&self) -> Vec<u64> {
        self.chains
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.chain_id)
            .collect()
    }

    fn set_status(&mut self, caller: Address, chain_id: u64, enabled: bool) -> BridgeResult<bool> {
        if caller != self.admin {
            return Err(BridgeError::Unauthorized { caller });
        }

        if self.is_enabled(chain_id) == enabled {
            debug!("Chain {} already has enabled={}", chain_id, enabled);
            return Ok(false);
        }

        self.chains
            .insert(chain_id, ChainConfig { chain_id, enabled });
        Ok(true)
    }
}
