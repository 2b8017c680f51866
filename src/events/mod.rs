//! Bridge event types and the append-only event log
//!
//! Events are the bridge's only outbound signal: an external relayer or
//! validator observes `Swap` events and answers, out of band, with an
//! attestation the recipient feeds back into `redeem`.
//!
//! The log retains the most recent `capacity` events; older ones are only
//! visible to subscribers that were listening when they were emitted.

use chrono::{DateTime, Utc};
use ethers::types::{Address, H256, U256};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

/// Events emitted by the bridge ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// Value locked on this chain for release on `dest_chain`
    Swap {
        swap_id: H256,
        sender: Address,
        amount: U256,
        dest_chain: u64,
        recipient_hint: Address,
    },

    /// Value released on this chain
    Redeem {
        swap_id: H256,
        recipient: Address,
        amount: U256,
    },

    /// Destination chain enabled or disabled by the administrator
    ChainStatusChanged { chain_id: u64, enabled: bool },
}

impl BridgeEvent {
    /// Get event name for metrics
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::Swap { .. } => "swap",
            BridgeEvent::Redeem { .. } => "redeem",
            BridgeEvent::ChainStatusChanged { .. } => "chain_status_changed",
        }
    }

    /// Check if a relayer needs to act on this event
    pub fn requires_attestation(&self) -> bool {
        matches!(self, BridgeEvent::Swap { .. })
    }
}

/// An event as recorded in the log
#[derive(Debug, Clone, Serialize)]
pub struct RecordedEvent {
    /// Position in the log, starting at 0
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: BridgeEvent,
}

#[derive(Default)]
struct Retained {
    records: VecDeque<RecordedEvent>,
    next_sequence: u64,
}

/// Bounded append-only log with live fan-out to subscribers
pub struct EventLog {
    capacity: usize,
    retained: RwLock<Retained>,
    event_tx: broadcast::Sender<RecordedEvent>,
}

impl EventLog {
    /// `capacity` bounds both the retained history and the broadcast
    /// channel; it must be positive.
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        Self {
            capacity,
            retained: RwLock::new(Retained::default()),
            event_tx,
        }
    }

    /// Append an event and broadcast it, evicting the oldest retained event
    /// once the log is full
    pub fn emit(&self, event: BridgeEvent) -> RecordedEvent {
        let recorded = {
            let mut retained = self
                .retained
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let recorded = RecordedEvent {
                sequence: retained.next_sequence,
                recorded_at: Utc::now(),
                event,
            };
            retained.next_sequence += 1;
            if retained.records.len() == self.capacity {
                retained.records.pop_front();
            }
            retained.records.push_back(recorded.clone());
            recorded
        };

        debug!(
            "Emitted event #{} {}",
            recorded.sequence,
            recorded.event.name()
        );

        // No receivers is fine
        let _ = self.event_tx.send(recorded.clone());
        recorded
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RecordedEvent> {
        self.event_tx.subscribe()
    }

    /// Retained events with `sequence >= from`
    pub fn since(&self, from: u64) -> Vec<RecordedEvent> {
        let retained = self
            .retained
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        retained
            .records
            .iter()
            .filter(|recorded| recorded.sequence >= from)
            .cloned()
            .collect()
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.retained
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(1024)
    }
}
