//! services/api/src/pipeline/creator.rs
//!
//! Creates exactly one persisted conversation record per live voice session.
//! The transcript callback can fire again before the creation round-trip
//! resolves, so concurrent triggers must share a single in-flight creation
//! rather than each issuing their own insert.

use chrono::Utc;
use solace_core::ports::ConversationStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipeline::consent::ConsentGate;
use crate::pipeline::context::SessionContext;

/// The result of a creation trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// This trigger performed the creation.
    Created(Uuid),
    /// A record already existed (or another trigger's creation was joined).
    Existing(Uuid),
    /// Consent denied persistence, or creation was attempted and abandoned.
    Skipped,
}

pub struct SessionCreator {
    store: Arc<dyn ConversationStore>,
    ctx: Arc<SessionContext>,
    consent: Arc<ConsentGate>,
}

impl SessionCreator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        ctx: Arc<SessionContext>,
        consent: Arc<ConsentGate>,
    ) -> Self {
        Self {
            store,
            ctx,
            consent,
        }
    }

    /// Ensures a conversation record exists for this connection.
    ///
    /// The session slot is a single-flight cell: whichever trigger gets there
    /// first runs the creation, and every concurrent trigger awaits that same
    /// outcome instead of issuing a second insert. An abandoned creation is
    /// remembered as `None` so later turns do not retry it.
    pub async fn ensure_session(&self) -> EnsureOutcome {
        if let Some(slot) = self.ctx.session_slot().get() {
            return match slot {
                Some(id) => EnsureOutcome::Existing(*id),
                None => EnsureOutcome::Skipped,
            };
        }

        if !self.consent.allows_persistence().await {
            return EnsureOutcome::Skipped;
        }

        let ran_creation = AtomicBool::new(false);
        let slot = self
            .ctx
            .session_slot()
            .get_or_init(|| async {
                ran_creation.store(true, Ordering::SeqCst);
                self.create_record().await
            })
            .await;

        match (slot, ran_creation.load(Ordering::SeqCst)) {
            (Some(id), true) => EnsureOutcome::Created(*id),
            (Some(id), false) => EnsureOutcome::Existing(*id),
            (None, _) => EnsureOutcome::Skipped,
        }
    }

    /// Inserts the record, retrying once without the ownership field when the
    /// primary write is rejected. A session that cannot be persisted at all
    /// continues live, it just leaves no record behind.
    async fn create_record(&self) -> Option<Uuid> {
        let title = format!("Voice session {}", Utc::now().format("%b %d, %Y"));
        let owner = self.ctx.user_id();

        match self.store.create_conversation(Some(owner), &title, "").await {
            Ok(session) => {
                info!(session_id = %session.id, "created conversation record");
                Some(session.id)
            }
            Err(first_err) => {
                warn!(
                    error = %first_err,
                    "conversation create failed; retrying without owner"
                );
                match self.store.create_conversation(None, &title, "").await {
                    Ok(session) => {
                        info!(
                            session_id = %session.id,
                            "created conversation record without owner"
                        );
                        Some(session.id)
                    }
                    Err(e) => {
                        error!(
                            error = %e,
                            "abandoning conversation record; session continues unpersisted"
                        );
                        None
                    }
                }
            }
        }
    }
}
