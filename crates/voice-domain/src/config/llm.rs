use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM realtime connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Realtime WebSocket endpoint, e.g. `wss://api.example.com/v1/realtime`.
    #[serde(default = "d_url")]
    pub realtime_url: String,
    /// Environment variable holding the bearer token (`LLM_API_KEY`).
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Model identifier sent as the `model` query parameter.
    #[serde(default = "d_model")]
    pub model: String,
    /// Voice timbre identifier.
    #[serde(default = "d_voice")]
    pub voice: String,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    /// Handshake timeout for the initial connect.
    #[serde(default = "d_handshake_ms")]
    pub handshake_timeout_ms: u64,
    /// Max reconnect attempts before the call is ended.
    #[serde(default = "d_max_reconnects")]
    pub max_reconnect_attempts: u32,
    #[serde(default)]
    pub vad: VadConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            realtime_url: d_url(),
            api_key_env: d_api_key_env(),
            model: d_model(),
            voice: d_voice(),
            temperature: d_temperature(),
            handshake_timeout_ms: d_handshake_ms(),
            max_reconnect_attempts: d_max_reconnects(),
            vad: VadConfig::default(),
        }
    }
}

/// Server-side voice-activity detection parameters (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    #[serde(default = "d_threshold")]
    pub threshold: f32,
    #[serde(default = "d_prefix_padding_ms")]
    pub prefix_padding_ms: u32,
    #[serde(default = "d_silence_ms")]
    pub silence_duration_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: d_threshold(),
            prefix_padding_ms: d_prefix_padding_ms(),
            silence_duration_ms: d_silence_ms(),
        }
    }
}

fn d_url() -> String {
    "wss://api.example.com/v1/realtime".into()
}
fn d_api_key_env() -> String {
    "LLM_API_KEY".into()
}
fn d_model() -> String {
    "gpt-4o-realtime-preview".into()
}
fn d_voice() -> String {
    "alloy".into()
}
fn d_temperature() -> f32 {
    0.8
}
fn d_handshake_ms() -> u64 {
    10_000
}
fn d_max_reconnects() -> u32 {
    3
}
fn d_threshold() -> f32 {
    0.5
}
fn d_prefix_padding_ms() -> u32 {
    300
}
fn d_silence_ms() -> u32 {
    500
}
