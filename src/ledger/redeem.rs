//! Release side of the bridge: at-most-once redemption

use crate::error::{BridgeError, BridgeResult};

use ethers::types::H256;
use std::collections::HashSet;

/// Swap ids that have been released. Entries are never removed.
#[derive(Debug, Default)]
pub struct RedeemLedger {
    redeemed: HashSet<H256>,
}

impl RedeemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_redeemed(&self, swap_id: &H256) -> bool {
        self.redeemed.contains(swap_id)
    }

    /// Fail with `DuplicateRedeem` if `swap_id` was already released
    pub fn check(&self, swap_id: &H256) -> BridgeResult<()> {
        if self.is_redeemed(swap_id) {
            return Err(BridgeError::DuplicateRedeem { swap_id: *swap_id });
        }
        Ok(())
    }

    /// Move `swap_id` to the redeemed state. The caller must have passed `check`.
    pub fn mark_redeemed(&mut self, swap_id: H256) {
        let fresh = self.redeemed.insert(swap_id);
        debug_assert!(fresh, "swap id redeemed twice");
    }

    pub fn len(&self) -> usize {
        self.redeemed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redeemed.is_empty()
    }
}
