//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::pipeline::PipelineSettings;
use solace_core::ports::ConversationStore;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
///
/// Per-connection state lives in each connection's `SessionPipeline`, not here.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConversationStore>,
    pub config: Arc<Config>,
    pub pipeline_settings: PipelineSettings,
}
