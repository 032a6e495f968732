//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It runs the init handshake, then feeds every relayed voice event into the
//! connection's `SessionPipeline` in arrival order.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use solace_core::domain::TranscriptTurn;
use solace_core::ports::VoiceEventSink;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::pipeline::SessionPipeline;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // --- 1. Init Handshake ---
    let pipeline = if let Some(Ok(Message::Text(init_json))) = receiver.next().await {
        match serde_json::from_str::<ClientMessage>(&init_json) {
            Ok(ClientMessage::Init { user_id }) => {
                info!(%user_id, "voice event stream opened");
                SessionPipeline::new(
                    app_state.store.clone(),
                    user_id,
                    app_state.pipeline_settings.clone(),
                )
            }
            _ => {
                error!("First message was not a valid init message.");
                return;
            }
        }
    } else {
        error!("Client disconnected before sending init message.");
        return;
    };

    let ready_json = serde_json::to_string(&ServerMessage::Ready).unwrap();
    if sender.send(Message::Text(ready_json.into())).await.is_err() {
        error!("Failed to send ready message.");
        return;
    }

    let watchdog = pipeline.spawn_watchdog();

    // --- 2. Main Event Loop ---
    // Events are dispatched one at a time, so turns reach the ingestor in the
    // order the streaming service delivered them.
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => dispatch_event(&pipeline, &text).await,
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    pipeline.finish().await;
    let _ = watchdog.await;
    info!("Voice event stream closed.");
}

/// Helper function to route one relayed event into the pipeline.
async fn dispatch_event(pipeline: &SessionPipeline, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(client_msg) => match client_msg {
            ClientMessage::TranscriptTurn {
                role,
                content,
                emotion_scores,
            } => {
                pipeline
                    .on_transcript_turn(TranscriptTurn {
                        role,
                        content,
                        emotion_scores: emotion_scores.unwrap_or_default(),
                    })
                    .await;
            }
            ClientMessage::SessionMetadata {
                external_chat_id,
                external_chat_group_id,
            } => {
                pipeline
                    .on_session_metadata(external_chat_id, external_chat_group_id)
                    .await;
            }
            ClientMessage::Error { code, message } => {
                pipeline.on_error(code, message).await;
            }
            ClientMessage::Init { .. } => {
                warn!("Received subsequent init message, which is ignored.");
            }
        },
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
        }
    }
}
