//! Error types for the bridge ledger

use ethers::types::{Address, H256, U256};
use thiserror::Error;

/// Reasons a bridge operation is rejected.
///
/// Every variant is terminal for the call that produced it: the ledger state
/// is left exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Unauthorized: {caller:?} is not the bridge administrator")]
    Unauthorized { caller: Address },

    #[error("Invalid destination chain {chain_id}: cannot bridge to the source chain")]
    InvalidDestinationChain { chain_id: u64 },

    #[error("Destination chain {chain_id} not supported")]
    ChainNotSupported { chain_id: u64 },

    #[error("Insufficient balance for {account:?}: have {have}, need {need}")]
    InsufficientBalance {
        account: Address,
        have: U256,
        need: U256,
    },

    #[error("Duplicate nonce {nonce} for sender {sender:?}")]
    DuplicateNonce { sender: Address, nonce: U256 },

    #[error("Invalid signature for swap 0x{}", hex::encode(.swap_id))]
    InvalidSignature { swap_id: H256 },

    #[error("Duplicate redeem for swap 0x{}", hex::encode(.swap_id))]
    DuplicateRedeem { swap_id: H256 },

    #[error("Custody error: {0}")]
    Custody(String),
}

impl BridgeError {
    /// Stable label for metrics and API responses
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Unauthorized { .. } => "unauthorized",
            BridgeError::InvalidDestinationChain { .. } => "invalid_destination_chain",
            BridgeError::ChainNotSupported { .. } => "chain_not_supported",
            BridgeError::InsufficientBalance { .. } => "insufficient_balance",
            BridgeError::DuplicateNonce { .. } => "duplicate_nonce",
            BridgeError::InvalidSignature { .. } => "invalid_signature",
            BridgeError::DuplicateRedeem { .. } => "duplicate_redeem",
            BridgeError::Custody(_) => "custody",
        }
    }

    /// Check if the error indicates an attempted replay of a lock or release
    pub fn is_replay(&self) -> bool {
        matches!(
            self,
            BridgeError::DuplicateNonce { .. } | BridgeError::DuplicateRedeem { .. }
        )
    }

    /// Check if error should trigger an alert
    pub fn should_alert(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidSignature { .. }
                | BridgeError::DuplicateRedeem { .. }
                | BridgeError::Custody(_)
        )
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
