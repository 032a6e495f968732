//! services/api/src/pipeline/mod.rs
//!
//! The session-identity reconciliation and transcript/emotion ingestion
//! pipeline. One `SessionPipeline` is built per voice connection and driven
//! purely by the event stream: the first transcript turn creates the
//! conversation record, the metadata event binds the streaming service's
//! identifiers to it, and every turn is persisted behind the consent gate.
//! No failure in here ever propagates back into the live conversation.

pub mod consent;
pub mod context;
pub mod creator;
pub mod ingestor;
pub mod pending;
pub mod reconciler;


pub use consent::ConsentGate;
pub use context::SessionContext;
pub use creator::{EnsureOutcome, SessionCreator};
pub use ingestor::{MessageIngestor, PersistOutcome};
pub use reconciler::{FlushOutcome, IdentityReconciler};

use async_trait::async_trait;
use solace_core::domain::{SessionStatus, TranscriptTurn};
use solace_core::ports::{ConversationStore, VoiceEventSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Tuning knobs for one connection's pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub watchdog_interval: Duration,
    pub watchdog_window: Duration,
    pub persist_max_attempts: u32,
    pub persist_backoff: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            watchdog_interval: Duration::from_secs(2),
            watchdog_window: Duration::from_secs(30),
            persist_max_attempts: 3,
            persist_backoff: Duration::from_secs(1),
        }
    }
}

/// The event-driven pipeline for a single voice connection.
pub struct SessionPipeline {
    store: Arc<dyn ConversationStore>,
    ctx: Arc<SessionContext>,
    creator: SessionCreator,
    reconciler: Arc<IdentityReconciler>,
    ingestor: MessageIngestor,
    shutdown: CancellationToken,
}

impl SessionPipeline {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        user_id: Uuid,
        settings: PipelineSettings,
    ) -> Self {
        let ctx = Arc::new(SessionContext::new(user_id));
        let consent = Arc::new(ConsentGate::new(store.clone(), user_id));
        let creator = SessionCreator::new(store.clone(), ctx.clone(), consent.clone());
        let reconciler = Arc::new(IdentityReconciler::new(
            store.clone(),
            ctx.clone(),
            &settings,
        ));
        let ingestor = MessageIngestor::new(store.clone(), consent, &settings);

        Self {
            store,
            ctx,
            creator,
            reconciler,
            ingestor,
            shutdown: CancellationToken::new(),
        }
    }

    /// The id of the persisted conversation record, once one exists.
    pub fn session_id(&self) -> Option<Uuid> {
        self.ctx.session_id()
    }

    /// Starts the identity watchdog for this connection. The task self-cancels
    /// once buffered identifiers are applied, when the bounded window lapses,
    /// or when `finish` shuts the pipeline down.
    pub fn spawn_watchdog(&self) -> JoinHandle<()> {
        self.reconciler.clone().spawn_watchdog(self.shutdown.clone())
    }

    /// Ends the pipeline at connection close: cancels the watchdog and stamps
    /// the conversation record with its final status and duration.
    pub async fn finish(&self) {
        self.shutdown.cancel();

        let Some(session_id) = self.ctx.session_id() else {
            return;
        };
        let duration_seconds = self.ctx.started_at().elapsed().as_secs().min(i32::MAX as u64) as i32;
        match self
            .store
            .finalize_conversation(session_id, SessionStatus::Completed, duration_seconds)
            .await
        {
            Ok(()) => info!(%session_id, duration_seconds, "stamped conversation completion"),
            Err(e) => warn!(%session_id, error = %e, "failed to stamp conversation completion"),
        }
    }
}

#[async_trait]
impl VoiceEventSink for SessionPipeline {
    async fn on_transcript_turn(&self, turn: TranscriptTurn) {
        let session_id = match self.creator.ensure_session().await {
            EnsureOutcome::Created(id) => {
                // Identifiers may already be waiting from a metadata event
                // that beat the creation round-trip.
                self.reconciler.flush_pending().await;
                Some(id)
            }
            EnsureOutcome::Existing(id) => Some(id),
            EnsureOutcome::Skipped => None,
        };
        self.ingestor.persist_turn(session_id, &turn).await;
    }

    async fn on_session_metadata(&self, external_chat_id: String, external_chat_group_id: String) {
        self.reconciler
            .bind_external_ids(&external_chat_id, &external_chat_group_id)
            .await;
    }

    async fn on_error(&self, code: String, message: String) {
        // Logged only; stream errors never feed back into the pipeline.
        warn!(code, message, "voice stream reported an error");
    }
}
