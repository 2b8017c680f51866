//! Fixed-width packed encoding and keccak256 hashing
//!
//! Integers are always widened to 32-byte big-endian words and addresses
//! take exactly 20 bytes, matching Solidity `abi.encodePacked` for `uint256`
//! and `address` operands. With every field at a fixed width no two distinct
//! tuples share an encoding.

use ethers::types::{Address, H256, U256};
use sha3::{Digest, Keccak256};

/// 32-byte big-endian word for an unsigned integer
pub fn word(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// Incremental packed encoder
#[derive(Default)]
pub struct Packed {
    hasher: Keccak256,
}

impl Packed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: Address) -> Self {
        self.hasher.update(address.as_bytes());
        self
    }

    pub fn uint(mut self, value: U256) -> Self {
        self.hasher.update(word(value));
        self
    }

    pub fn bytes32(mut self, value: H256) -> Self {
        self.hasher.update(value.as_bytes());
        self
    }

    /// Domain separator: the keccak256 of `tag` as one 32-byte word
    pub fn tag(mut self, tag: &str) -> Self {
        self.hasher.update(Keccak256::digest(tag.as_bytes()));
        self
    }

    /// keccak256 of everything appended so far
    pub fn keccak(self) -> H256 {
        H256::from_slice(&self.hasher.finalize())
    }
}
