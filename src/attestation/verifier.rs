//! Signer recovery against the configured validator identity

use super::attestation_message;

use ethers::types::{Address, Signature, H256, U256};
use ethers::utils::hash_message;
use tracing::debug;

/// Recover the signer of an EIP-191 personal signature over a 32-byte
/// message. Returns `None` for malformed signatures.
pub fn recover_personal_signer(message: H256, signature: &[u8]) -> Option<Address> {
    let signature = match Signature::try_from(signature) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Malformed signature: {}", e);
            return None;
        }
    };

    let digest = hash_message(message.as_bytes());

    match signature.recover(digest) {
        Ok(signer) => Some(signer),
        Err(e) => {
            debug!("Signer recovery failed: {}", e);
            None
        }
    }
}

/// Checks that an attestation was produced by the validator key
#[derive(Debug, Clone, Copy)]
pub struct AttestationVerifier {
    validator: Address,
}

impl AttestationVerifier {
    pub fn new(validator: Address) -> Self {
        Self { validator }
    }

    /// Get the validator identity
    pub fn validator(&self) -> Address {
        self.validator
    }

    /// Recover the address that signed the release message.
    ///
    /// Returns `None` for malformed signatures.
    pub fn recover_signer(
        &self,
        swap_id: H256,
        amount: U256,
        recipient: Address,
        signature: &[u8],
    ) -> Option<Address> {
        recover_personal_signer(attestation_message(swap_id, amount, recipient), signature)
    }

    /// True iff `signature` is the validator's signature over
    /// `(swap_id, amount, recipient)`
    pub fn verify(
        &self,
        swap_id: H256,
        amount: U256,
        recipient: Address,
        signature: &[u8],
    ) -> bool {
        self.recover_signer(swap_id, amount, recipient, signature)
            .map(|signer| signer == self.validator)
            .unwrap_or(false)
    }
}
