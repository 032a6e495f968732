//! crates/solace_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or web framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A persisted record of one live voice conversation.
///
/// Created once per voice connection; the external identifiers are attached
/// at most once and never overwritten, and the only other mutation over the
/// record's lifetime is the final status/duration stamp at connection end.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub summary: String,
    pub external_chat_id: Option<String>,
    pub external_chat_group_id: Option<String>,
    pub status: SessionStatus,
    pub duration_seconds: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl ConversationSession {
    /// True once the streaming service's identifiers have been attached.
    pub fn has_external_ids(&self) -> bool {
        self.external_chat_id.is_some() || self.external_chat_group_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> SessionStatus {
        match value {
            "completed" => SessionStatus::Completed,
            _ => SessionStatus::Active,
        }
    }
}

/// The speaker of a single transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One transcript turn as delivered by the voice-streaming service, together
/// with its derived emotion score vector. Turns are append-only and ordered
/// by arrival.
#[derive(Debug, Clone)]
pub struct TranscriptTurn {
    pub role: TurnRole,
    pub content: String,
    pub emotion_scores: BTreeMap<String, f64>,
}

impl TranscriptTurn {
    /// Derives the per-dimension emotion rows for this turn, one per named
    /// emotion in the score vector.
    pub fn emotion_metrics(&self, session_id: Uuid) -> Vec<EmotionMetric> {
        self.emotion_scores
            .iter()
            .map(|(emotion_type, intensity)| EmotionMetric {
                session_id,
                emotion_type: emotion_type.clone(),
                intensity: *intensity,
                confidence: None,
            })
            .collect()
    }
}

/// A single emotion dimension measured for one turn of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionMetric {
    pub session_id: Uuid,
    pub emotion_type: String,
    pub intensity: f64,
    pub confidence: Option<f64>,
}

/// The billing tier a user is subscribed to. Stored as free text in the
/// profile row; anything unrecognized parses to `None` at the adapter layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionTier {
    Free,
    Plus,
    Pro,
}

impl SubscriptionTier {
    pub fn parse(value: &str) -> Option<SubscriptionTier> {
        match value {
            "free" => Some(SubscriptionTier::Free),
            "plus" => Some(SubscriptionTier::Plus),
            "pro" => Some(SubscriptionTier::Pro),
            _ => None,
        }
    }
}

/// The slice of a user's profile this pipeline reads: enough to decide
/// whether conversation content may be durably stored.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub subscription_tier: Option<SubscriptionTier>,
    pub persistence_preference: Option<bool>,
}

impl UserProfile {
    /// The consent policy: free tier never persists, an explicit opt-out
    /// never persists, and everything else (paid, unknown tier) does.
    pub fn persistence_allowed(&self) -> bool {
        if self.subscription_tier == Some(SubscriptionTier::Free) {
            return false;
        }
        self.persistence_preference != Some(false)
    }
}
