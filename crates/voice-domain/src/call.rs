//! Call-scoped data model: the Bridge's only mutable per-call state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a call for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Active,
    Ended,
    Failed,
}

/// The Bridge's conversation state machine (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    UserSpeaking,
    AiSpeaking,
    ToolRunning,
}

/// Running audio counters. Mutated in place by the Bridge task only —
/// never shared mutably across tasks, so no atomics are needed here.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AudioStats {
    pub in_frames: u64,
    pub out_frames: u64,
    pub in_bytes: u64,
    pub out_bytes: u64,
}

/// Reason a call ended, recorded in the end-of-call Session Cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    TelephonyClosed,
    LlmReconnectExhausted,
    DurationCeiling,
    FatalError,
}

/// The Call record. Owned exclusively by the Bridge for the call's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub call_id: String,
    pub stream_id: String,
    pub caller: Option<String>,
    pub start_instant: DateTime<Utc>,
    pub status: CallStatus,
    pub conversation_state: ConversationState,
    /// Non-null only while `conversation_state == AiSpeaking`.
    pub current_response_item_id: Option<String>,
    pub audio_stats: AudioStats,
}

impl Call {
    pub fn new(call_id: impl Into<String>, stream_id: impl Into<String>, caller: Option<String>) -> Self {
        Self {
            call_id: call_id.into(),
            stream_id: stream_id.into(),
            caller,
            start_instant: Utc::now(),
            status: CallStatus::Active,
            conversation_state: ConversationState::Idle,
            current_response_item_id: None,
            audio_stats: AudioStats::default(),
        }
    }
}

/// Role attached to a [`TranscriptEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    User,
    Assistant,
    ToolCall,
    ToolResult,
}

/// An append-only transcript line. Never mutated once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub instant: DateTime<Utc>,
    pub role: TranscriptRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl TranscriptEntry {
    pub fn speech(role: TranscriptRole, text: impl Into<String>) -> Self {
        Self {
            instant: Utc::now(),
            role,
            text: text.into(),
            tool_name: None,
            arguments: None,
            result: None,
        }
    }

    pub fn tool_call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            instant: Utc::now(),
            role: TranscriptRole::ToolCall,
            text: String::new(),
            tool_name: Some(name.into()),
            arguments: Some(arguments),
            result: None,
        }
    }

    pub fn tool_result(name: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            instant: Utc::now(),
            role: TranscriptRole::ToolResult,
            text: String::new(),
            tool_name: Some(name.into()),
            arguments: None,
            result: Some(result),
        }
    }
}

/// A completed tool invocation, logged with latency for the rolling metric series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
    pub result: serde_json::Value,
    pub instant: DateTime<Utc>,
    pub duration_ms: u64,
}
