//! Bridge ledger - the lock/attest/release state machine
//!
//! [`Bridge`] owns the chain registry, the swap and redeem ledgers, the
//! attestation verifier and the event log. Every mutating operation runs
//! under one write lock and validates all preconditions before its first
//! effect, so a failed call leaves no trace.
//!
//! Per swap id the lifecycle is `Locked` (on the source ledger) then
//! `Redeemed` (on the destination ledger), with no way back.

mod redeem;
mod swap;

pub use redeem::RedeemLedger;
pub use swap::{compute_swap_id, SwapLedger, SwapRecord};

use crate::attestation::AttestationVerifier;
use crate::chain::ChainRegistry;
use crate::config::BridgeConfig;
use crate::custody::TokenCustody;
use crate::error::{BridgeError, BridgeResult};
use crate::events::{BridgeEvent, EventLog, RecordedEvent};

use ethers::types::{Address, H256, U256};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

/// Mutable ledger state, guarded as a unit
struct LedgerState {
    registry: ChainRegistry,
    swaps: SwapLedger,
    redeems: RedeemLedger,
}

/// A single bridge endpoint on one chain
pub struct Bridge {
    /// Identifier of the chain this ledger lives on
    chain_id: u64,
    /// Token whose value is bridged
    token: Address,
    /// Administrator of the chain registry, fixed at construction
    admin: Address,
    verifier: AttestationVerifier,
    custody: Arc<dyn TokenCustody>,
    state: RwLock<LedgerState>,
    events: EventLog,
}

impl Bridge {
    /// Create a bridge with no destination chains enabled
    pub fn new(
        chain_id: u64,
        token: Address,
        validator: Address,
        admin: Address,
        custody: Arc<dyn TokenCustody>,
    ) -> Self {
        Self {
            chain_id,
            token,
            admin,
            verifier: AttestationVerifier::new(validator),
            custody,
            state: RwLock::new(LedgerState {
                registry: ChainRegistry::new(admin),
                swaps: SwapLedger::new(),
                redeems: RedeemLedger::new(),
            }),
            events: EventLog::new(1024),
        }
    }

    /// Create a bridge from configuration, enabling the configured chains
    pub async fn from_config(
        config: &BridgeConfig,
        custody: Arc<dyn TokenCustody>,
    ) -> BridgeResult<Self> {
        let mut bridge = Self::new(
            config.chain_id,
            config.token,
            config.validator,
            config.admin,
            custody,
        );
        bridge.events = EventLog::new(config.event_buffer);

        for &chain_id in &config.enabled_chains {
            bridge.enable_chain(config.admin, chain_id).await?;
        }

        Ok(bridge)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn validator(&self) -> Address {
        self.verifier.validator()
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Lock `amount` from `sender` for release on `dest_chain`.
    ///
    /// Returns the swap id the validator will attest to.
    pub async fn swap(
        &self,
        sender: Address,
        nonce: U256,
        amount: U256,
        dest_chain: u64,
        recipient_hint: Address,
    ) -> BridgeResult<H256> {
        let mut state = self.state.write().await;

        let result = self
            .apply_swap(&mut state, sender, nonce, amount, dest_chain, recipient_hint)
            .await;

        match &result {
            Ok(swap_id) => {
                info!(
                    "Swap 0x{} accepted: {} from {:?} to chain {}",
                    hex::encode(swap_id),
                    amount,
                    sender,
                    dest_chain
                );
                crate::metrics::record_swap(dest_chain);
            }
            Err(e) => {
                if e.should_alert() {
                    error!("Swap from {:?} rejected: {}", sender, e);
                } else {
                    warn!("Swap from {:?} rejected: {}", sender, e);
                }
                crate::metrics::record_rejection("swap", e);
            }
        }

        result
    }

    async fn apply_swap(
        &self,
        state: &mut LedgerState,
        sender: Address,
        nonce: U256,
        amount: U256,
        dest_chain: u64,
        recipient_hint: Address,
    ) -> BridgeResult<H256> {
        if dest_chain == self.chain_id {
            return Err(BridgeError::InvalidDestinationChain {
                chain_id: dest_chain,
            });
        }

        if !state.registry.is_enabled(dest_chain) {
            return Err(BridgeError::ChainNotSupported {
                chain_id: dest_chain,
            });
        }

        state.swaps.check_nonce(sender, nonce)?;

        let balance = self.custody.balance_of(sender).await?;
        if balance < amount {
            return Err(BridgeError::InsufficientBalance {
                account: sender,
                have: balance,
                need: amount,
            });
        }

        // First effect; nothing else is applied if custody refuses
        self.custody.debit(sender, amount).await?;

        let swap_id = compute_swap_id(sender, nonce, self.chain_id, dest_chain);
        state.swaps.insert(SwapRecord {
            swap_id,
            sender,
            nonce,
            amount,
            source_chain: self.chain_id,
            dest_chain,
            recipient_hint,
        });

        self.events.emit(BridgeEvent::Swap {
            swap_id,
            sender,
            amount,
            dest_chain,
            recipient_hint,
        });

        Ok(swap_id)
    }

    /// Release `amount` to `recipient` against a validator attestation.
    ///
    /// The attestation is checked against exactly the supplied triple. The
    /// amount and recipient are not compared with any local swap record and
    /// no local record is required: the swap normally lives on another
    /// chain's ledger.
    pub async fn redeem(
        &self,
        swap_id: H256,
        amount: U256,
        recipient: Address,
        signature: &[u8],
    ) -> BridgeResult<()> {
        let mut state = self.state.write().await;

        let result = self
            .apply_redeem(&mut state, swap_id, amount, recipient, signature)
            .await;

        match &result {
            Ok(()) => {
                info!(
                    "Redeem 0x{} accepted: {} to {:?}",
                    hex::encode(swap_id),
                    amount,
                    recipient
                );
                crate::metrics::record_redeem(self.chain_id);
            }
            Err(e) => {
                // Forged attestations and replayed releases point at a
                // compromised relayer or key
                if e.should_alert() {
                    error!("Redeem 0x{} rejected: {}", hex::encode(swap_id), e);
                } else {
                    warn!("Redeem 0x{} rejected: {}", hex::encode(swap_id), e);
                }
                crate::metrics::record_rejection("redeem", e);
            }
        }

        result
    }

    async fn apply_redeem(
        &self,
        state: &mut LedgerState,
        swap_id: H256,
        amount: U256,
        recipient: Address,
        signature: &[u8],
    ) -> BridgeResult<()> {
        if !self.verifier.verify(swap_id, amount, recipient, signature) {
            return Err(BridgeError::InvalidSignature { swap_id });
        }

        state.redeems.check(&swap_id)?;

        self.custody.credit(recipient, amount).await?;
        state.redeems.mark_redeemed(swap_id);

        self.events.emit(BridgeEvent::Redeem {
            swap_id,
            recipient,
            amount,
        });

        Ok(())
    }

    /// Accept swaps towards `chain_id`. Administrator only, idempotent.
    pub async fn enable_chain(&self, caller: Address, chain_id: u64) -> BridgeResult<()> {
        self.set_chain_status(caller, chain_id, true).await
    }

    /// Stop accepting swaps towards `chain_id`. Administrator only, idempotent.
    pub async fn disable_chain(&self, caller: Address, chain_id: u64) -> BridgeResult<()> {
        self.set_chain_status(caller, chain_id, false).await
    }

    async fn set_chain_status(
        &self,
        caller: Address,
        chain_id: u64,
        enabled: bool,
    ) -> BridgeResult<()> {
        let mut state = self.state.write().await;

        let changed = if enabled {
            state.registry.enable_chain(caller, chain_id)
        } else {
            state.registry.disable_chain(caller, chain_id)
        };

        match changed {
            Ok(true) => {
                info!("Chain {} enabled={}", chain_id, enabled);
                crate::metrics::record_chain_status(chain_id, enabled);
                self.events
                    .emit(BridgeEvent::ChainStatusChanged { chain_id, enabled });
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => {
                warn!("Chain {} status change rejected: {}", chain_id, e);
                crate::metrics::record_rejection("chain_admin", &e);
                Err(e)
            }
        }
    }

    pub async fn is_chain_enabled(&self, chain_id: u64) -> bool {
        self.state.read().await.registry.is_enabled(chain_id)
    }

    pub async fn enabled_chains(&self) -> Vec<u64> {
        self.state.read().await.registry.enabled_chains()
    }

    pub async fn is_nonce_used(&self, sender: Address, nonce: U256) -> bool {
        self.state.read().await.swaps.is_nonce_used(sender, nonce)
    }

    pub async fn is_redeemed(&self, swap_id: H256) -> bool {
        self.state.read().await.redeems.is_redeemed(&swap_id)
    }

    /// Look up a swap accepted by this ledger
    pub async fn swap_record(&self, swap_id: H256) -> Option<SwapRecord> {
        self.state.read().await.swaps.get(&swap_id).cloned()
    }

    /// Custody balance of `account`
    pub async fn balance_of(&self, account: Address) -> BridgeResult<U256> {
        self.custody.balance_of(account).await
    }

    /// Recorded events with `sequence >= from`
    pub fn events(&self, from: u64) -> Vec<RecordedEvent> {
        self.events.since(from)
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RecordedEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::{InMemoryCustody, MockTokenCustody};
    use crate::test_utils::{sign_attestation, wallet, OTHER_KEY, VALIDATOR_KEY};

    use ethers::signers::{LocalWallet, Signer};

    const OWN_CHAIN: u64 = 1;
    const DEST_CHAIN: u64 = 2;

    fn admin() -> Address {
        Address::repeat_byte(0xad)
    }

    fn token() -> Address {
        Address::repeat_byte(0x70)
    }

    async fn setup(
        balances: Vec<(Address, u64)>,
    ) -> (Bridge, Arc<InMemoryCustody>, LocalWallet) {
        let validator = wallet(VALIDATOR_KEY);
        let custody = Arc::new(InMemoryCustody::with_balances(
            balances.into_iter().map(|(a, v)| (a, U256::from(v))),
        ).unwrap());
        let bridge = Bridge::new(
            OWN_CHAIN,
            token(),
            validator.address(),
            admin(),
            custody.clone(),
        );
        bridge.enable_chain(admin(), DEST_CHAIN).await.unwrap();
        (bridge, custody, validator)
    }

    #[tokio::test]
    async fn test_getters_reflect_construction() {
        let (bridge, _, validator) = setup(vec![]).await;
        assert_eq!(bridge.chain_id(), OWN_CHAIN);
        assert_eq!(bridge.token(), token());
        assert_eq!(bridge.validator(), validator.address());
        assert_eq!(bridge.admin(), admin());
    }

    #[tokio::test]
    async fn test_swap_to_own_chain_rejected() {
        let sender = Address::repeat_byte(1);
        let (bridge, custody, _) = setup(vec![(sender, 100)]).await;

        let err = bridge
            .swap(sender, U256::one(), U256::from(100), OWN_CHAIN, Address::zero())
            .await
            .unwrap_err();

        assert_eq!(err, BridgeError::InvalidDestinationChain { chain_id: OWN_CHAIN });
        assert_eq!(custody.balance_of(sender).await.unwrap(), U256::from(100));
        assert!(!bridge.is_nonce_used(sender, U256::one()).await);
    }

    #[tokio::test]
    async fn test_own_chain_check_precedes_registry_check() {
        let sender = Address::repeat_byte(1);
        let (bridge, _, _) = setup(vec![]).await;
        // Own chain enabled by mistake still cannot be a destination
        bridge.enable_chain(admin(), OWN_CHAIN).await.unwrap();

        let err = bridge
            .swap(sender, U256::one(), U256::zero(), OWN_CHAIN, Address::zero())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_destination_chain");
    }

    #[tokio::test]
    async fn test_swap_to_unsupported_chain_rejected() {
        let sender = Address::repeat_byte(1);
        let (bridge, _, _) = setup(vec![(sender, 100)]).await;

        let err = bridge
            .swap(sender, U256::one(), U256::from(100), 3, Address::zero())
            .await
            .unwrap_err();

        assert_eq!(err, BridgeError::ChainNotSupported { chain_id: 3 });
    }

    #[tokio::test]
    async fn test_swap_to_disabled_chain_rejected() {
        let sender = Address::repeat_byte(1);
        let (bridge, _, _) = setup(vec![(sender, 100)]).await;
        bridge.disable_chain(admin(), DEST_CHAIN).await.unwrap();

        let err = bridge
            .swap(sender, U256::one(), U256::from(100), DEST_CHAIN, Address::zero())
            .await
            .unwrap_err();

        assert_eq!(err, BridgeError::ChainNotSupported { chain_id: DEST_CHAIN });
    }

    #[tokio::test]
    async fn test_swap_debits_and_records() {
        let sender = Address::repeat_byte(1);
        let hint = Address::repeat_byte(2);
        let (bridge, custody, _) = setup(vec![(sender, 100)]).await;

        let swap_id = bridge
            .swap(sender, U256::one(), U256::from(100), DEST_CHAIN, hint)
            .await
            .unwrap();

        assert_eq!(swap_id, compute_swap_id(sender, U256::one(), OWN_CHAIN, DEST_CHAIN));
        assert_eq!(custody.balance_of(sender).await.unwrap(), U256::zero());
        assert!(bridge.is_nonce_used(sender, U256::one()).await);

        let record = bridge.swap_record(swap_id).await.unwrap();
        assert_eq!(record.amount, U256::from(100));
        assert_eq!(record.source_chain, OWN_CHAIN);
        assert_eq!(record.dest_chain, DEST_CHAIN);
        assert_eq!(record.recipient_hint, hint);

        let events = bridge.events(0);
        assert_eq!(
            events.last().unwrap().event,
            BridgeEvent::Swap {
                swap_id,
                sender,
                amount: U256::from(100),
                dest_chain: DEST_CHAIN,
                recipient_hint: hint,
            }
        );
    }

    #[tokio::test]
    async fn test_swap_with_insufficient_balance_rejected() {
        let sender = Address::repeat_byte(1);
        let (bridge, custody, _) = setup(vec![(sender, 99)]).await;

        let err = bridge
            .swap(sender, U256::one(), U256::from(100), DEST_CHAIN, Address::zero())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "insufficient_balance");
        assert_eq!(custody.balance_of(sender).await.unwrap(), U256::from(99));
        assert!(!bridge.is_nonce_used(sender, U256::one()).await);
    }

    #[tokio::test]
    async fn test_duplicate_nonce_rejected_and_state_retained() {
        let sender = Address::repeat_byte(1);
        let (bridge, custody, _) = setup(vec![(sender, 200)]).await;

        let first = bridge
            .swap(sender, U256::one(), U256::from(100), DEST_CHAIN, Address::zero())
            .await
            .unwrap();
        let events_after_first = bridge.events(0).len();

        let err = bridge
            .swap(sender, U256::one(), U256::from(100), DEST_CHAIN, Address::zero())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BridgeError::DuplicateNonce {
                sender,
                nonce: U256::one()
            }
        );
        assert_eq!(custody.balance_of(sender).await.unwrap(), U256::from(100));
        assert!(bridge.swap_record(first).await.is_some());
        assert_eq!(bridge.events(0).len(), events_after_first);
    }

    #[tokio::test]
    async fn test_nonce_check_precedes_balance_check() {
        let sender = Address::repeat_byte(1);
        let (bridge, _, _) = setup(vec![(sender, 100)]).await;

        bridge
            .swap(sender, U256::one(), U256::from(100), DEST_CHAIN, Address::zero())
            .await
            .unwrap();

        // Balance is now zero, but the replay is reported first
        let err = bridge
            .swap(sender, U256::one(), U256::from(100), DEST_CHAIN, Address::zero())
            .await
            .unwrap_err();
        assert!(err.is_replay());
    }

    #[tokio::test]
    async fn test_same_nonce_different_senders() {
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);
        let (bridge, custody, _) = setup(vec![(alice, 100), (bob, 100)]).await;

        let a = bridge
            .swap(alice, U256::one(), U256::from(100), DEST_CHAIN, Address::zero())
            .await
            .unwrap();
        let b = bridge
            .swap(bob, U256::one(), U256::from(100), DEST_CHAIN, Address::zero())
            .await
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(custody.balance_of(alice).await.unwrap(), U256::zero());
        assert_eq!(custody.balance_of(bob).await.unwrap(), U256::zero());
    }

    #[tokio::test]
    async fn test_redeem_with_validator_signature() {
        let recipient = Address::repeat_byte(3);
        let (bridge, custody, validator) = setup(vec![]).await;
        let swap_id = compute_swap_id(Address::repeat_byte(1), U256::one(), OWN_CHAIN, DEST_CHAIN);
        let sig = sign_attestation(&validator, swap_id, U256::from(100), recipient).await;

        bridge
            .redeem(swap_id, U256::from(100), recipient, &sig)
            .await
            .unwrap();

        assert_eq!(custody.balance_of(recipient).await.unwrap(), U256::from(100));
        assert!(bridge.is_redeemed(swap_id).await);
    }

    #[tokio::test]
    async fn test_redeem_with_foreign_signature_rejected() {
        let recipient = Address::repeat_byte(3);
        let (bridge, custody, _) = setup(vec![]).await;
        let swap_id = H256::repeat_byte(0x55);
        let sig = sign_attestation(&wallet(OTHER_KEY), swap_id, U256::from(100), recipient).await;

        let err = bridge
            .redeem(swap_id, U256::from(100), recipient, &sig)
            .await
            .unwrap_err();

        assert_eq!(err, BridgeError::InvalidSignature { swap_id });
        assert_eq!(custody.balance_of(recipient).await.unwrap(), U256::zero());
        assert!(!bridge.is_redeemed(swap_id).await);
    }

    #[tokio::test]
    async fn test_forged_redeem_raises_alert_but_bad_swap_does_not() {
        let recipient = Address::repeat_byte(3);
        let sender = Address::repeat_byte(1);
        let (bridge, _, _) = setup(vec![(sender, 1)]).await;
        let alerts =
            |op: &str, kind: &str| crate::metrics::ALERTS.with_label_values(&[op, kind]).get();
        let before = alerts("redeem", "invalid_signature");

        let swap_id = H256::repeat_byte(0x56);
        let sig = sign_attestation(&wallet(OTHER_KEY), swap_id, U256::one(), recipient).await;
        bridge
            .redeem(swap_id, U256::one(), recipient, &sig)
            .await
            .unwrap_err();
        bridge
            .swap(sender, U256::one(), U256::from(2), DEST_CHAIN, Address::zero())
            .await
            .unwrap_err();

        assert!(alerts("redeem", "invalid_signature") - before >= 1.0);
        assert_eq!(alerts("swap", "insufficient_balance"), 0.0);
    }

    #[tokio::test]
    async fn test_second_redeem_rejected() {
        let recipient = Address::repeat_byte(3);
        let (bridge, custody, validator) = setup(vec![]).await;
        let swap_id = H256::repeat_byte(0x55);
        let sig = sign_attestation(&validator, swap_id, U256::from(100), recipient).await;

        bridge
            .redeem(swap_id, U256::from(100), recipient, &sig)
            .await
            .unwrap();
        let err = bridge
            .redeem(swap_id, U256::from(100), recipient, &sig)
            .await
            .unwrap_err();

        assert_eq!(err, BridgeError::DuplicateRedeem { swap_id });
        assert_eq!(custody.balance_of(recipient).await.unwrap(), U256::from(100));
    }

    #[tokio::test]
    async fn test_signature_check_precedes_dedup() {
        let recipient = Address::repeat_byte(3);
        let (bridge, _, validator) = setup(vec![]).await;
        let swap_id = H256::repeat_byte(0x55);
        let sig = sign_attestation(&validator, swap_id, U256::from(100), recipient).await;
        bridge
            .redeem(swap_id, U256::from(100), recipient, &sig)
            .await
            .unwrap();

        let err = bridge
            .redeem(swap_id, U256::from(100), recipient, &[0u8; 65])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_signature");
    }

    #[tokio::test]
    async fn test_failed_debit_leaves_no_trace() {
        let sender = Address::repeat_byte(1);
        let mut custody = MockTokenCustody::new();
        custody
            .expect_balance_of()
            .returning(|_| Ok(U256::from(1_000)));
        custody
            .expect_debit()
            .times(1)
            .returning(|_, _| Err(BridgeError::Custody("token paused".to_string())));

        let bridge = Bridge::new(
            OWN_CHAIN,
            token(),
            wallet(VALIDATOR_KEY).address(),
            admin(),
            Arc::new(custody),
        );
        bridge.enable_chain(admin(), DEST_CHAIN).await.unwrap();
        let events_before = bridge.events(0).len();

        let err = bridge
            .swap(sender, U256::one(), U256::from(10), DEST_CHAIN, Address::zero())
            .await
            .unwrap_err();

        assert_eq!(err, BridgeError::Custody("token paused".to_string()));
        assert!(!bridge.is_nonce_used(sender, U256::one()).await);
        assert_eq!(bridge.events(0).len(), events_before);
    }

    #[tokio::test]
    async fn test_failed_credit_leaves_swap_redeemable() {
        let recipient = Address::repeat_byte(3);
        let validator = wallet(VALIDATOR_KEY);
        let mut custody = MockTokenCustody::new();
        let mut calls = 0;
        custody.expect_credit().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(BridgeError::Custody("overflow".to_string()))
            } else {
                Ok(())
            }
        });

        let bridge = Bridge::new(OWN_CHAIN, token(), validator.address(), admin(), Arc::new(custody));
        let swap_id = H256::repeat_byte(0x66);
        let sig = sign_attestation(&validator, swap_id, U256::from(5), recipient).await;

        assert!(bridge.redeem(swap_id, U256::from(5), recipient, &sig).await.is_err());
        assert!(!bridge.is_redeemed(swap_id).await);

        bridge
            .redeem(swap_id, U256::from(5), recipient, &sig)
            .await
            .unwrap();
        assert!(bridge.is_redeemed(swap_id).await);
    }

    #[tokio::test]
    async fn test_chain_admin_events_and_authorization() {
        let (bridge, _, _) = setup(vec![]).await;
        let intruder = Address::repeat_byte(0x99);

        assert_eq!(
            bridge.enable_chain(intruder, 5).await,
            Err(BridgeError::Unauthorized { caller: intruder })
        );
        assert!(!bridge.is_chain_enabled(5).await);

        let before = bridge.events(0).len();
        bridge.enable_chain(admin(), 5).await.unwrap();
        bridge.enable_chain(admin(), 5).await.unwrap();
        let events = bridge.events(before as u64);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].event,
            BridgeEvent::ChainStatusChanged {
                chain_id: 5,
                enabled: true
            }
        );
        assert_eq!(bridge.enabled_chains().await, vec![DEST_CHAIN, 5]);
    }
}
