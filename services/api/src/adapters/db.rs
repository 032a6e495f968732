//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ConversationStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solace_core::domain::{
    ConversationSession, SessionStatus, SubscriptionTier, TranscriptTurn, UserProfile,
};
use solace_core::ports::{ConversationStore, StoreError, StoreResult};
use sqlx::error::ErrorKind;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ConversationStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps an `sqlx` error onto the port taxonomy. Connectivity problems are
/// transient; constraint violations are permanent rejections.
fn map_db_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => StoreError::Rejected(db.to_string()),
            _ => StoreError::Unexpected(db.to_string()),
        },
        sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProfileRecord {
    id: Uuid,
    subscription_tier: String,
    persistence_preference: Option<bool>,
}
impl ProfileRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            id: self.id,
            subscription_tier: SubscriptionTier::parse(&self.subscription_tier),
            persistence_preference: self.persistence_preference,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Option<Uuid>,
    title: String,
    summary: String,
    external_chat_id: Option<String>,
    external_chat_group_id: Option<String>,
    status: String,
    duration_seconds: Option<i32>,
    created_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> ConversationSession {
        ConversationSession {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            summary: self.summary,
            external_chat_id: self.external_chat_id,
            external_chat_group_id: self.external_chat_group_id,
            status: SessionStatus::parse(&self.status),
            duration_seconds: self.duration_seconds,
            created_at: self.created_at,
        }
    }
}

const SESSION_COLUMNS: &str = "id, user_id, title, summary, external_chat_id, \
     external_chat_group_id, status, duration_seconds, created_at";

//=========================================================================================
// `ConversationStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ConversationStore for DbAdapter {
    async fn fetch_profile(&self, user_id: Uuid) -> StoreResult<UserProfile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT id, subscription_tier, persistence_preference FROM user_profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                StoreError::NotFound(format!("User profile {} not found", user_id))
            }
            other => map_db_error(other),
        })?;

        Ok(record.to_domain())
    }

    async fn create_conversation(
        &self,
        owner: Option<Uuid>,
        title: &str,
        summary: &str,
    ) -> StoreResult<ConversationSession> {
        let query = format!(
            "INSERT INTO conversation_sessions (id, user_id, title, summary, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(owner)
            .bind(title)
            .bind(summary)
            .bind(SessionStatus::Active.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(record.to_domain())
    }

    async fn get_conversation(&self, session_id: Uuid) -> StoreResult<ConversationSession> {
        let query = format!(
            "SELECT {} FROM conversation_sessions WHERE id = $1",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&query)
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    StoreError::NotFound(format!("Session {} not found", session_id))
                }
                other => map_db_error(other),
            })?;

        Ok(record.to_domain())
    }

    async fn attach_external_ids(
        &self,
        session_id: Uuid,
        chat_id: &str,
        chat_group_id: &str,
    ) -> StoreResult<bool> {
        // The IS NULL guard makes the write first-wins: a concurrent or repeated
        // bind can never overwrite identifiers that are already attached.
        let result = sqlx::query(
            "UPDATE conversation_sessions \
             SET external_chat_id = $2, external_chat_group_id = $3 \
             WHERE id = $1 AND external_chat_id IS NULL AND external_chat_group_id IS NULL",
        )
        .bind(session_id)
        .bind(chat_id)
        .bind(chat_group_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Nothing updated: either the ids were already set, or the record is gone.
        let session = self.get_conversation(session_id).await?;
        if session.has_external_ids() {
            Ok(false)
        } else {
            Err(StoreError::Unexpected(format!(
                "Session {} exists without external ids but update matched no rows",
                session_id
            )))
        }
    }

    async fn finalize_conversation(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        duration_seconds: i32,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE conversation_sessions SET status = $2, duration_seconds = $3 WHERE id = $1",
        )
        .bind(session_id)
        .bind(status.as_str())
        .bind(duration_seconds)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }
        Ok(())
    }

    async fn append_turn(&self, session_id: Uuid, turn: &TranscriptTurn) -> StoreResult<Uuid> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let turn_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO transcript_turns (id, session_id, role, content) VALUES ($1, $2, $3, $4)",
        )
        .bind(turn_id)
        .bind(session_id)
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        for metric in turn.emotion_metrics(session_id) {
            sqlx::query(
                "INSERT INTO emotion_metrics (id, session_id, emotion_type, intensity, confidence) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(metric.session_id)
            .bind(&metric.emotion_type)
            .bind(metric.intensity)
            .bind(metric.confidence)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(turn_id)
    }
}
