//! services/api/src/pipeline/pending.rs
//!
//! The ephemeral holding area for streaming-service identifiers that arrived
//! before the conversation record they belong to exists. Entries live only in
//! memory for the duration of one connection and are dropped as soon as they
//! are applied, or once they outlive the reconciliation window.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// An external identifier pair waiting for its conversation record.
#[derive(Debug, Clone)]
pub struct PendingExternalIds {
    pub chat_id: String,
    pub chat_group_id: String,
    pub buffered_at: Instant,
}

/// Single-slot buffer for the most recent unapplied identifier pair.
pub struct PendingIdentifierStore {
    ttl: Duration,
    slot: Mutex<Option<PendingExternalIds>>,
}

impl PendingIdentifierStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Buffers an identifier pair, replacing any earlier unapplied pair.
    pub async fn put(&self, chat_id: &str, chat_group_id: &str) {
        let mut slot = self.slot.lock().await;
        *slot = Some(PendingExternalIds {
            chat_id: chat_id.to_string(),
            chat_group_id: chat_group_id.to_string(),
            buffered_at: Instant::now(),
        });
    }

    /// Returns a copy of the buffered pair, discarding it first if it has
    /// outlived its window.
    pub async fn peek(&self) -> Option<PendingExternalIds> {
        let mut slot = self.slot.lock().await;
        if let Some(pending) = slot.as_ref() {
            if pending.buffered_at.elapsed() > self.ttl {
                *slot = None;
            }
        }
        slot.clone()
    }

    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }

    pub async fn is_empty(&self) -> bool {
        self.slot.lock().await.is_none()
    }
}
