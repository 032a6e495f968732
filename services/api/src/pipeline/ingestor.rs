//! services/api/src/pipeline/ingestor.rs
//!
//! Persists transcript turns and their emotion scores. Persistence is
//! best-effort: a turn that cannot be stored after bounded retries is dropped
//! with a log line, and the next turn is attempted regardless, so the live
//! conversation is never held up by storage trouble.

use solace_core::domain::TranscriptTurn;
use solace_core::ports::ConversationStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::pipeline::consent::ConsentGate;
use crate::pipeline::PipelineSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Persisted,
    /// Consent denied or no conversation record exists; nothing was written.
    Skipped,
    /// All attempts failed; the turn is dropped.
    Failed,
}

pub struct MessageIngestor {
    store: Arc<dyn ConversationStore>,
    consent: Arc<ConsentGate>,
    max_attempts: u32,
    backoff: Duration,
}

impl MessageIngestor {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        consent: Arc<ConsentGate>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            store,
            consent,
            max_attempts: settings.persist_max_attempts.max(1),
            backoff: settings.persist_backoff,
        }
    }

    /// Persists one turn, with exponential backoff on transient failures.
    ///
    /// Rejections are not retried; there is no reduced payload to fall back
    /// to for a turn, so a rejected turn is dropped immediately.
    pub async fn persist_turn(
        &self,
        session_id: Option<Uuid>,
        turn: &TranscriptTurn,
    ) -> PersistOutcome {
        let Some(session_id) = session_id else {
            return PersistOutcome::Skipped;
        };
        if !self.consent.allows_persistence().await {
            return PersistOutcome::Skipped;
        }

        let mut delay = self.backoff;
        for attempt in 1..=self.max_attempts {
            match self.store.append_turn(session_id, turn).await {
                Ok(turn_id) => {
                    debug!(%session_id, %turn_id, role = turn.role.as_str(), "persisted transcript turn");
                    return PersistOutcome::Persisted;
                }
                Err(e) if !e.is_transient() => {
                    error!(%session_id, error = %e, "turn rejected by storage; dropping");
                    return PersistOutcome::Failed;
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        %session_id,
                        attempt,
                        error = %e,
                        "persist attempt failed; retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    error!(
                        %session_id,
                        error = %e,
                        "dropping turn after {} attempts",
                        attempt
                    );
                }
            }
        }
        PersistOutcome::Failed
    }
}
