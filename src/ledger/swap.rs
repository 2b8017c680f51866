//! Lock side of the bridge: nonce dedup and swap records

use crate::error::{BridgeError, BridgeResult};
use crate::hashing::Packed;

use ethers::types::{Address, H256, U256};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Deterministic identifier of a swap.
///
/// `keccak256(sender ‖ uint256(nonce) ‖ uint256(source_chain) ‖ uint256(dest_chain))`.
/// Anyone holding the public lock parameters can recompute it.
pub fn compute_swap_id(sender: Address, nonce: U256, source_chain: u64, dest_chain: u64) -> H256 {
    Packed::new()
        .address(sender)
        .uint(nonce)
        .uint(U256::from(source_chain))
        .uint(U256::from(dest_chain))
        .keccak()
}

/// An accepted lock. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapRecord {
    pub swap_id: H256,
    pub sender: Address,
    pub nonce: U256,
    pub amount: U256,
    pub source_chain: u64,
    pub dest_chain: u64,
    pub recipient_hint: Address,
}

/// Used nonces and the append-only swap record store
#[derive(Debug, Default)]
pub struct SwapLedger {
    used_nonces: HashSet<(Address, U256)>,
    records: HashMap<H256, SwapRecord>,
}

impl SwapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_nonce_used(&self, sender: Address, nonce: U256) -> bool {
        self.used_nonces.contains(&(sender, nonce))
    }

    /// Fail with `DuplicateNonce` if `(sender, nonce)` was already used
    pub fn check_nonce(&self, sender: Address, nonce: U256) -> BridgeResult<()> {
        if self.is_nonce_used(sender, nonce) {
            return Err(BridgeError::DuplicateNonce { sender, nonce });
        }
        Ok(())
    }

    /// Record an accepted swap. The caller must have passed `check_nonce`.
    pub fn insert(&mut self, record: SwapRecord) {
        debug_assert!(!self.is_nonce_used(record.sender, record.nonce));
        self.used_nonces.insert((record.sender, record.nonce));
        self.records.insert(record.swap_id, record);
    }

    pub fn get(&self, swap_id: &H256) -> Option<&SwapRecord> {
        self.records.get(swap_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
