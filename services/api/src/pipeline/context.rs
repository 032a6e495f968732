//! services/api/src/pipeline/context.rs
//!
//! Per-connection shared state. A `SessionContext` is created when the event
//! stream opens and passed into each pipeline component, replacing any notion
//! of ambient global state: the session-id slot is the single place the
//! "current conversation record" is published from.

use std::time::Instant;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// State shared by the pipeline components of one voice connection.
///
/// The session slot is written exactly once, by `SessionCreator`: either with
/// `Some(id)` when a conversation record exists, or with `None` when creation
/// was attempted and abandoned. Everyone else only reads it.
pub struct SessionContext {
    user_id: Uuid,
    started_at: Instant,
    session_slot: OnceCell<Option<Uuid>>,
}

impl SessionContext {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            started_at: Instant::now(),
            session_slot: OnceCell::new(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// The id of the persisted conversation record, once one exists.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_slot.get().copied().flatten()
    }

    /// The creation slot itself; only `SessionCreator` initializes it.
    pub(crate) fn session_slot(&self) -> &OnceCell<Option<Uuid>> {
        &self.session_slot
    }
}
