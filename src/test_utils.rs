//! Validator keys and signing helpers shared by unit tests

use crate::attestation::attestation_message;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256, U256};

/// Well-known development keys
pub const VALIDATOR_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const OTHER_KEY: &str = "7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6";

pub fn wallet(key: &str) -> LocalWallet {
    key.parse::<LocalWallet>().expect("valid test key")
}

/// Personal-message signature over the release message, as validator tooling produces it
pub async fn sign_attestation(
    signer: &LocalWallet,
    swap_id: H256,
    amount: U256,
    recipient: Address,
) -> Vec<u8> {
    let message = attestation_message(swap_id, amount, recipient);
    signer
        .sign_message(message.as_bytes())
        .await
        .expect("signing succeeds")
        .to_vec()
}
