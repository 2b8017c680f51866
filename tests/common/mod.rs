//! Shared fixtures for integration tests

#![allow(dead_code)]

use bridge_ledger::{attestation_message, Bridge, InMemoryCustody};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256, U256};
use std::sync::Arc;

/// Development accounts: validator, admin, recipient, sender, other
pub const VALIDATOR_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const ADMIN_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const RECIPIENT_KEY: &str = "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";
pub const SENDER_KEY: &str = "7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6";
pub const OTHER_KEY: &str = "47e179ec197488593b187f80a00eb0da91f1b9d0b13f8733639f19c30a34926a";

pub const TOKEN: &str = "0x065Ce3AB42d3B0a73459b1FF631B400E8048D745";

pub fn wallet(key: &str) -> LocalWallet {
    key.parse::<LocalWallet>().expect("valid test key")
}

pub fn address(key: &str) -> Address {
    wallet(key).address()
}

pub fn token() -> Address {
    TOKEN.parse().expect("valid token address")
}

/// Bridge on `chain_id` administered by `ADMIN_KEY`, attested by `VALIDATOR_KEY`
pub fn bridge(chain_id: u64, custody: Arc<InMemoryCustody>) -> Bridge {
    Bridge::new(
        chain_id,
        token(),
        address(VALIDATOR_KEY),
        address(ADMIN_KEY),
        custody,
    )
}

/// Personal-sign a 32-byte message
pub async fn sign_message(signer: &LocalWallet, message: H256) -> Vec<u8> {
    signer
        .sign_message(message.as_bytes())
        .await
        .expect("signing succeeds")
        .to_vec()
}

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
