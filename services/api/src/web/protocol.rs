//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser relay and the API
//! server. The browser owns the connection to the voice-streaming service and
//! forwards its events here verbatim; payload fields keep the SDK's camelCase.

use serde::{Deserialize, Serialize};
use solace_core::domain::TurnRole;
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser Relay) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Identifies the user. This must be the first message sent on the connection.
    #[serde(rename_all = "camelCase")]
    Init { user_id: Uuid },

    /// One transcript turn from the voice-streaming service, with its
    /// optional emotion score vector.
    #[serde(rename_all = "camelCase")]
    TranscriptTurn {
        role: TurnRole,
        content: String,
        #[serde(default)]
        emotion_scores: Option<BTreeMap<String, f64>>,
    },

    /// The streaming service's identifiers for this conversation and its
    /// resumable group.
    #[serde(rename_all = "camelCase")]
    SessionMetadata {
        external_chat_id: String,
        external_chat_group_id: String,
    },

    /// An error reported by the voice-streaming service. The SDK's own `type`
    /// field is relayed as `code` because `type` is the envelope tag here.
    Error { code: String, message: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser Relay)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
///
/// Persistence failures are deliberately absent: nothing that goes wrong in
/// the ingestion pipeline is surfaced to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the init handshake; the relay may start forwarding events.
    Ready,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transcript_turn_event() {
        let json = r#"{"type":"transcript_turn","role":"assistant","content":"How was your week?","emotionScores":{"calmness":0.83,"joy":0.12}}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::TranscriptTurn {
                role,
                content,
                emotion_scores,
            } => {
                assert_eq!(role, TurnRole::Assistant);
                assert_eq!(content, "How was your week?");
                let scores = emotion_scores.unwrap();
                assert_eq!(scores.len(), 2);
                assert!((scores["calmness"] - 0.83).abs() < f64::EPSILON);
            }
            other => panic!("parsed the wrong variant: {:?}", other),
        }
    }

    #[test]
    fn transcript_turn_scores_are_optional() {
        let json = r#"{"type":"transcript_turn","role":"user","content":"Hello."}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::TranscriptTurn { emotion_scores, .. } => {
                assert!(emotion_scores.is_none())
            }
            other => panic!("parsed the wrong variant: {:?}", other),
        }
    }

    #[test]
    fn parses_session_metadata_event() {
        let json = r#"{"type":"session_metadata","externalChatId":"chat-123","externalChatGroupId":"group-456"}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::SessionMetadata {
                external_chat_id,
                external_chat_group_id,
            } => {
                assert_eq!(external_chat_id, "chat-123");
                assert_eq!(external_chat_group_id, "group-456");
            }
            other => panic!("parsed the wrong variant: {:?}", other),
        }
    }

    #[test]
    fn parses_init_and_error_messages() {
        let user_id = Uuid::new_v4();
        let json = format!(r#"{{"type":"init","userId":"{}"}}"#, user_id);
        match serde_json::from_str::<ClientMessage>(&json).unwrap() {
            ClientMessage::Init { user_id: parsed } => assert_eq!(parsed, user_id),
            other => panic!("parsed the wrong variant: {:?}", other),
        }

        let json = r#"{"type":"error","code":"socket_closed","message":"upstream went away"}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::Error { code, .. } => assert_eq!(code, "socket_closed"),
            other => panic!("parsed the wrong variant: {:?}", other),
        }
    }

    #[test]
    fn ready_message_wire_shape() {
        let json = serde_json::to_string(&ServerMessage::Ready).unwrap();
        assert_eq!(json, r#"{"type":"ready"}"#);
    }
}
