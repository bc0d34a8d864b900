//! Server-pushed event feed.
//!
//! Workers and API handlers publish lifecycle events onto a broadcast bus;
//! the WebSocket endpoint forwards them to subscribed clients. Each event
//! serializes as `{ "channel": "<entity>:<verb>", "payload": { "<entity>":
//! ..., "timestamp": ... } }`.

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::debug;

use crate::db::deposits::Deposit;
use crate::db::vault_transfers::VaultTransfer;
use crate::db::withdrawals::Withdrawal;

#[derive(Debug, Clone)]
pub enum Event {
    DepositDetected(Deposit),
    DepositUpdated(Deposit),
    DepositCredited(Deposit),
    WithdrawalUpdated(Withdrawal),
    VaultTransferInitiated(VaultTransfer),
    VaultTransferUpdated(VaultTransfer),
    VaultTransferCompleted(VaultTransfer),
}

impl Event {
    pub fn channel(&self) -> &'static str {
        match self {
            Event::DepositDetected(_) => "deposit:detected",
            Event::DepositUpdated(_) => "deposit:updated",
            Event::DepositCredited(_) => "deposit:credited",
            Event::WithdrawalUpdated(_) => "withdrawal:updated",
            Event::VaultTransferInitiated(_) => "vaultTransfer:initiated",
            Event::VaultTransferUpdated(_) => "vaultTransfer:updated",
            Event::VaultTransferCompleted(_) => "vaultTransfer:completed",
        }
    }

    fn entity(&self) -> (&'static str, Value) {
        match self {
            Event::DepositDetected(d) | Event::DepositUpdated(d) | Event::DepositCredited(d) => {
                ("deposit", json!(d))
            }
            Event::WithdrawalUpdated(w) => ("withdrawal", json!(w)),
            Event::VaultTransferInitiated(t)
            | Event::VaultTransferUpdated(t)
            | Event::VaultTransferCompleted(t) => ("vaultTransfer", json!(t)),
        }
    }

    /// Wire representation pushed to WebSocket clients.
    pub fn to_message(&self) -> Value {
        let (key, entity) = self.entity();
        json!({
            "channel": self.channel(),
            "payload": {
                key: entity,
                "timestamp": Utc::now(),
            },
        })
    }
}

/// Fan-out bus over `tokio::sync::broadcast`. Slow subscribers lag and drop
/// messages rather than backpressuring the workers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: Event) {
        // Err means no live subscribers, which is fine.
        if let Err(e) = self.tx.send(event) {
            debug!("event dropped, no subscribers: {}", e.0.channel());
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
