//! LLM Realtime Protocol wire types (spec §6).
//!
//! Event-typed JSON over WebSocket. Server events the core consumes decode
//! into [`LlmServerEvent`]; unrecognized `type` values decode to `Unknown`
//! so the core can log-and-ignore per spec §6 rather than drop the frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound (core -> LLM)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LlmClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded PCM16 24kHz little-endian.
        audio: String,
    },

    #[serde(rename = "response.create")]
    ResponseCreate,

    #[serde(rename = "response.cancel")]
    ResponseCancel,

    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        item_id: String,
        content_index: u32,
        audio_end_ms: u64,
    },

    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItemInput },

    #[serde(rename = "conversation.item.create")]
    FunctionCallOutputCreate { item: FunctionCallOutputItem },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    pub modalities: Vec<String>,
    pub instructions: Option<String>,
    pub voice: String,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub input_audio_transcription: InputAudioTranscription,
    pub turn_detection: TurnDetection,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputAudioTranscription {
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
    pub create_response: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationItemInput {
    #[serde(rename = "type")]
    pub kind: String, // "message" for the wrap-up synthetic message
    pub role: String, // spec Open Question: synthetic wrap-up is sent as role="user"
    pub content: Vec<ConversationContentInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationContentInput {
    #[serde(rename = "type")]
    pub kind: String, // "input_text"
    pub text: String,
}

/// Gateway -> LLM: the result of a completed tool invocation, carried by
/// [`LlmClientEvent::FunctionCallOutputCreate`].
#[derive(Debug, Clone, Serialize)]
pub struct FunctionCallOutputItem {
    #[serde(rename = "type")]
    pub kind: String, // "function_call_output"
    pub call_id: String,
    pub output: String, // JSON-encoded tool result
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound (LLM -> core)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum LlmServerEvent {
    #[serde(rename = "session.created")]
    SessionCreated { session: Value },

    #[serde(rename = "session.updated")]
    SessionUpdated { session: Value },

    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,

    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,

    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        item_id: String,
        /// Base64-encoded PCM16 24kHz little-endian.
        delta: String,
    },

    #[serde(rename = "response.audio.done")]
    AudioDone { item_id: String },

    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone { item_id: String, transcript: String },

    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputAudioTranscriptionCompleted { item_id: String, transcript: String },

    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        call_id: String,
        name: String,
        arguments: String,
    },

    #[serde(rename = "response.done")]
    ResponseDone { response: Value },

    #[serde(rename = "rate_limits.updated")]
    RateLimitsUpdated { rate_limits: Value },

    #[serde(rename = "error")]
    Error { error: Value },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_delta_round_trips_fields() {
        let raw = r#"{"type":"response.audio.delta","item_id":"I1","delta":"AAA="}"#;
        let event: LlmServerEvent = serde_json::from_str(raw).unwrap();
        match event {
            LlmServerEvent::AudioDelta { item_id, delta } => {
                assert_eq!(item_id, "I1");
                assert_eq!(delta, "AAA=");
            }
            _ => panic!("expected AudioDelta"),
        }
    }

    #[test]
    fn unknown_server_event_type_is_ignored_not_rejected() {
        let raw = r#"{"type":"some.future.event","blob":1}"#;
        let event: LlmServerEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event, LlmServerEvent::Unknown));
    }

    #[test]
    fn function_call_arguments_done_parses() {
        let raw = r#"{"type":"response.function_call_arguments.done","call_id":"call_1","name":"list_available_slots","arguments":"{\"date\":\"2026-02-10\"}"}"#;
        let event: LlmServerEvent = serde_json::from_str(raw).unwrap();
        match event {
            LlmServerEvent::FunctionCallArgumentsDone { call_id, name, arguments } => {
                assert_eq!(call_id, "call_1");
                assert_eq!(name, "list_available_slots");
                assert!(arguments.contains("2026-02-10"));
            }
            _ => panic!("expected FunctionCallArgumentsDone"),
        }
    }

    #[test]
    fn session_update_serializes_configured_fields() {
        let cfg = LlmClientEvent::SessionUpdate {
            session: SessionConfig {
                modalities: vec!["text".into(), "audio".into()],
                instructions: None,
                voice: "alloy".into(),
                input_audio_format: "pcm16".into(),
                output_audio_format: "pcm16".into(),
                input_audio_transcription: InputAudioTranscription {
                    model: "whisper-1".into(),
                },
                turn_detection: TurnDetection {
                    kind: "server_vad".into(),
                    threshold: 0.5,
                    prefix_padding_ms: 300,
                    silence_duration_ms: 500,
                    create_response: true,
                },
                tools: vec![],
                tool_choice: "auto".into(),
                temperature: 0.8,
            },
        };
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["type"], "session.update");
        assert_eq!(json["session"]["voice"], "alloy");
        assert_eq!(json["session"]["turn_detection"]["threshold"], 0.5);
    }

    #[test]
    fn conversation_item_truncate_serializes() {
        let ev = LlmClientEvent::ConversationItemTruncate {
            item_id: "I1".into(),
            content_index: 0,
            audio_end_ms: 640,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "conversation.item.truncate");
        assert_eq!(json["audio_end_ms"], 640);
    }
}
