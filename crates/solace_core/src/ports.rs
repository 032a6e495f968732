//! crates/solace_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or the
//! voice-streaming SDK.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ConversationSession, SessionStatus, TranscriptTurn, UserProfile};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all storage port operations.
///
/// The taxonomy drives the pipeline's retry decisions: `Unavailable` and
/// `Unexpected` are worth retrying, `Rejected` and `NotFound` are not.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Rejected by storage: {0}")]
    Rejected(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected storage error occurred: {0}")]
    Unexpected(String),
}

impl StoreError {
    /// Whether a retry of the same operation could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Unexpected(_))
    }
}

/// A convenience type alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ConversationStore: Send + Sync {
    // --- User Profiles ---
    async fn fetch_profile(&self, user_id: Uuid) -> StoreResult<UserProfile>;

    // --- Conversation Sessions ---
    async fn create_conversation(
        &self,
        owner: Option<Uuid>,
        title: &str,
        summary: &str,
    ) -> StoreResult<ConversationSession>;

    async fn get_conversation(&self, session_id: Uuid) -> StoreResult<ConversationSession>;

    /// Attaches the streaming service's identifiers to a session record.
    ///
    /// Returns `Ok(true)` when the identifiers were written and `Ok(false)`
    /// when the record already carried identifiers (the write is a no-op,
    /// never an overwrite).
    async fn attach_external_ids(
        &self,
        session_id: Uuid,
        chat_id: &str,
        chat_group_id: &str,
    ) -> StoreResult<bool>;

    async fn finalize_conversation(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        duration_seconds: i32,
    ) -> StoreResult<()>;

    // --- Transcript Turns and Emotion Metrics ---
    /// Persists one transcript turn and, in the same logical operation, one
    /// emotion row per named dimension of its score vector.
    async fn append_turn(&self, session_id: Uuid, turn: &TranscriptTurn) -> StoreResult<Uuid>;
}

/// The event-subscriber contract the pipeline implements against the
/// voice-streaming collaborator. Events arrive in delivery order; handlers
/// must never propagate an error back into the stream.
#[async_trait]
pub trait VoiceEventSink: Send + Sync {
    async fn on_transcript_turn(&self, turn: TranscriptTurn);

    async fn on_session_metadata(&self, external_chat_id: String, external_chat_group_id: String);

    async fn on_error(&self, code: String, message: String);
}
