//! Validator attestations
//!
//! A redeem is authorized by a secp256k1 signature from the configured
//! validator over the canonical message
//! `keccak256(swap_id ‖ uint256(amount) ‖ recipient)`, signed with the
//! EIP-191 personal-message prefix.
//!
//! The validator key is the sole trust anchor of the bridge. Anyone holding
//! it can authorize an unbounded release for any swap id, amount and
//! recipient; custody of that key lives outside this crate.

mod verifier;

pub use verifier::{recover_personal_signer, AttestationVerifier};

use crate::hashing::Packed;

use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

/// Release authorization handed to the recipient out of band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub swap_id: H256,
    pub amount: U256,
    pub recipient: Address,
    pub signature: Bytes,
}

/// Canonical message the validator signs for a release
pub fn attestation_message(swap_id: H256, amount: U256, recipient: Address) -> H256 {
    Packed::new()
        .bytes32(swap_id)
        .uint(amount)
        .address(recipient)
        .keccak()
}
