//! Request authentication for mutating API routes
//!
//! The acting identity of a swap (`sender`) or chain administration call
//! (`caller`) must sign the request with its key. The signed message is a
//! packed keccak over a route tag, the bridge's own chain id and every field
//! of the request, prefixed per EIP-191 exactly like validator attestations.
//! Binding the chain id keeps a request signed for one ledger from being
//! replayed against another.

use super::ApiError;
use crate::attestation::recover_personal_signer;
use crate::hashing::Packed;

use chrono::Utc;
use ethers::types::{Address, H256, U256};
use tracing::warn;

/// Chain administration operations exposed over the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    EnableChain,
    DisableChain,
}

impl AdminAction {
    pub fn tag(&self) -> &'static str {
        match self {
            AdminAction::EnableChain => "bridge.enable_chain",
            AdminAction::DisableChain => "bridge.disable_chain",
        }
    }
}

/// Message a sender signs to submit a swap to the bridge on `bridge_chain`
pub fn swap_request_message(
    bridge_chain: u64,
    sender: Address,
    nonce: U256,
    amount: U256,
    dest_chain: u64,
    recipient_hint: Address,
) -> H256 {
    Packed::new()
        .tag("bridge.swap")
        .uint(U256::from(bridge_chain))
        .address(sender)
        .uint(nonce)
        .uint(amount)
        .uint(U256::from(dest_chain))
        .address(recipient_hint)
        .keccak()
}

/// Message the administrator signs to change the status of `chain_id`.
///
/// `deadline` is a unix timestamp in seconds; the signature is refused once
/// it has passed.
pub fn admin_request_message(
    bridge_chain: u64,
    action: AdminAction,
    chain_id: u64,
    deadline: u64,
) -> H256 {
    Packed::new()
        .tag(action.tag())
        .uint(U256::from(bridge_chain))
        .uint(U256::from(chain_id))
        .uint(U256::from(deadline))
        .keccak()
}

/// Require `signature` over `message` to come from `claimed`
pub fn authenticate(claimed: Address, message: H256, signature: &[u8]) -> Result<(), ApiError> {
    match recover_personal_signer(message, signature) {
        Some(signer) if signer == claimed => Ok(()),
        Some(signer) => {
            warn!(
                "Request claiming {:?} was signed by {:?}",
                claimed, signer
            );
            Err(ApiError::Forbidden(format!(
                "request signature does not match {:?}",
                claimed
            )))
        }
        None => {
            warn!("Request claiming {:?} carries a malformed signature", claimed);
            Err(ApiError::Forbidden("malformed request signature".to_string()))
        }
    }
}

/// Refuse requests whose deadline has passed
pub fn check_deadline(deadline: u64) -> Result<(), ApiError> {
    let now = Utc::now().timestamp().max(0) as u64;
    if deadline < now {
        return Err(ApiError::Forbidden(format!(
            "request expired at {} (now {})",
            deadline, now
        )));
    }
    Ok(())
}
