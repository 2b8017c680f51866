//! Bridge Ledger - lock/attest/release value transfer between chains
//!
//! A sender locks value with [`Bridge::swap`] on the source chain. A single
//! trusted validator observes the resulting `Swap` event off-system and signs
//! an attestation, which the recipient presents to [`Bridge::redeem`] on the
//! destination chain. Each lock is bound to a deterministic swap id and may
//! be released at most once.

pub mod api;
pub mod attestation;
pub mod chain;
pub mod config;
pub mod custody;
pub mod error;
pub mod events;
pub mod hashing;
pub mod ledger;
pub mod metrics;

#[cfg(test)]
pub(crate) mod test_utils;

pub use attestation::{attestation_message, Attestation, AttestationVerifier};
pub use chain::ChainRegistry;
pub use custody::{InMemoryCustody, TokenCustody};
pub use error::{BridgeError, BridgeResult};
pub use events::{BridgeEvent, RecordedEvent};
pub use ledger::{compute_swap_id, Bridge, SwapRecord};
