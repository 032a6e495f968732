pub mod domain;
pub mod ports;

pub use domain::{
    ConversationSession, EmotionMetric, SessionStatus, SubscriptionTier, TranscriptTurn, TurnRole,
    UserProfile,
};
pub use ports::{ConversationStore, StoreError, StoreResult, VoiceEventSink};
