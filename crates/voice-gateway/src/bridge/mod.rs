//! C1 Stream Bridge: the per-call orchestrator (spec §4.1).
//!
//! One `Bridge` is spawned per accepted telephony connection and owns that
//! connection plus one outbound LLM connection for its entire lifetime. The
//! event loop is a single `tokio::select!`, mirroring the teacher's
//! `node_ws::handle_socket` / `NodeClient::connect_and_run` shape: sockets
//! are typed message streams decoded at the boundary, and the state machine
//! (kept pure in [`state_machine`]) branches on the tag.

pub mod state_machine;

use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use voice_domain::call::{Call, CallStatus, ConversationState, EndReason, TranscriptEntry, TranscriptRole};
use voice_domain::config::Config;
use voice_domain::error::Result;
use voice_protocol::llm::{
    ConversationContentInput, ConversationItemInput, FunctionCallOutputItem, InputAudioTranscription,
    LlmClientEvent, LlmServerEvent, SessionConfig, ToolSpec, TurnDetection,
};
use voice_protocol::telephony::{OutboundMediaPayload, TelephonyEvent, TelephonyOutboundEvent};

use crate::llm::{self, LlmConnection, ReconnectBackoff};
use crate::state::AppState;

use state_machine::{transition, SideEffect, SmEvent};

/// Result of an off-loaded tool dispatch, funneled back through a channel
/// so the audio `select!` arm is never blocked by the database call.
struct ToolOutcome {
    llm_call_id: String,
    result: Value,
}

pub struct Bridge {
    call: Call,
    stream_sid: String,
    telephony_sink: SplitSink<WebSocket, WsMessage>,
    telephony_stream: SplitStream<WebSocket>,
    llm: LlmConnection,
    config: std::sync::Arc<Config>,
    state: AppState,
    greeted: bool,
    current_item_audio_ms: u64,
    ended: bool,
    reconnect_attempt: u32,
    tool_tx: mpsc::Sender<ToolOutcome>,
    tool_rx: mpsc::Receiver<ToolOutcome>,
}

/// Accept a telephony connection, wait for its `start` event, connect to
/// the LLM, and run the Bridge until teardown.
pub async fn run(socket: WebSocket, state: AppState) {
    let config = state.config.clone();
    let (mut sink, mut stream) = socket.split();

    let start = match wait_for_start(&mut stream).await {
        Some(s) => s,
        None => {
            tracing::warn!("telephony peer disconnected before sending start");
            return;
        }
    };

    let caller = start
        .start
        .custom_parameters
        .get("phone")
        .cloned();
    let call = Call::new(start.start.call_sid.clone(), start.stream_sid.clone(), caller);
    tracing::info!(call_id = %call.call_id, stream_sid = %call.stream_id, "call started");

    let api_key = std::env::var(&config.llm.api_key_env).unwrap_or_default();
    let llm_conn = match llm::connect(&config.llm, &api_key).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(call_id = %call.call_id, error = %e, "initial LLM connect failed");
            let _ = sink.close().await;
            return;
        }
    };

    let (tool_tx, tool_rx) = mpsc::channel(32);
    let mut bridge = Bridge {
        call,
        stream_sid: start.stream_sid,
        telephony_sink: sink,
        telephony_stream: stream,
        llm: llm_conn,
        config,
        state,
        greeted: false,
        current_item_audio_ms: 0,
        ended: false,
        reconnect_attempt: 0,
        tool_tx,
        tool_rx,
    };

    if let Err(e) = bridge.send_session_update().await {
        tracing::warn!(call_id = %bridge.call.call_id, error = %e, "failed to send initial session.update");
    }

    bridge.run_loop().await;
}

struct StartFrame {
    stream_sid: String,
    start: voice_protocol::telephony::StartMetadata,
}

async fn wait_for_start(stream: &mut SplitStream<WebSocket>) -> Option<StartFrame> {
    let timeout = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(Ok(msg)) = stream.next().await {
            if let WsMessage::Text(text) = msg {
                if let Ok(TelephonyEvent::Start(s)) = serde_json::from_str::<TelephonyEvent>(&text) {
                    return Some(StartFrame {
                        stream_sid: s.stream_sid,
                        start: s.start,
                    });
                }
            }
        }
        None
    })
    .await;
    timeout.unwrap_or(None)
}

impl Bridge {
    async fn run_loop(&mut self) {
        let ceiling = Duration::from_secs(self.config.call.max_duration_minutes * 60);
        let duration_timer = tokio::time::sleep(ceiling);
        tokio::pin!(duration_timer);
        let mut duration_fired = false;

        // Armed (via .reset()) only once the duration ceiling fires; the `if`
        // guard keeps it unpolled (and so harmless) until then.
        let hard_cut_timer = tokio::time::sleep(Duration::from_secs(0));
        tokio::pin!(hard_cut_timer);
        let mut hard_cut_armed = false;

        loop {
            if self.ended {
                break;
            }

            tokio::select! {
                biased;

                _ = &mut hard_cut_timer, if hard_cut_armed => {
                    tracing::warn!(call_id = %self.call.call_id, "hard cut reached, tearing down");
                    self.teardown(EndReason::DurationCeiling).await;
                }

                _ = &mut duration_timer, if !duration_fired => {
                    duration_fired = true;
                    self.handle_duration_ceiling().await;
                    hard_cut_timer.as_mut().reset(
                        tokio::time::Instant::now() + Duration::from_secs(self.config.call.hard_cut_grace_seconds),
                    );
                    hard_cut_armed = true;
                }

                msg = self.telephony_stream.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => self.handle_telephony_frame(&text).await,
                        Some(Ok(WsMessage::Close(_))) | None => {
                            self.teardown(EndReason::TelephonyClosed).await;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(call_id = %self.call.call_id, error = %e, "telephony socket error");
                            self.teardown(EndReason::TelephonyClosed).await;
                        }
                    }
                }

                event = self.llm.inbound.recv() => {
                    match event {
                        Some(ev) => self.handle_llm_event(ev).await,
                        None => self.handle_llm_disconnect().await,
                    }
                }

                Some(outcome) = self.tool_rx.recv() => {
                    self.handle_tool_outcome(outcome).await;
                }
            }
        }
    }

    async fn handle_telephony_frame(&mut self, text: &str) {
        let event = match serde_json::from_str::<TelephonyEvent>(text) {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(call_id = %self.call.call_id, error = %e, "malformed telephony frame, dropping");
                return;
            }
        };

        match event {
            TelephonyEvent::Media(m) => self.handle_inbound_media(m).await,
            TelephonyEvent::Stop(_) => self.teardown(EndReason::TelephonyClosed).await,
            TelephonyEvent::Mark(m) => {
                tracing::debug!(call_id = %self.call.call_id, stream_sid = %m.stream_sid, "mark received");
            }
            TelephonyEvent::Connected(_) | TelephonyEvent::Start(_) | TelephonyEvent::Unknown => {}
        }
    }

    async fn handle_inbound_media(&mut self, media: voice_protocol::telephony::MediaEvent) {
        let mulaw = match BASE64.decode(&media.media.payload) {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(call_id = %self.call.call_id, error = %e, "bad base64 in media frame");
                return;
            }
        };

        self.call.audio_stats.in_frames += 1;
        self.call.audio_stats.in_bytes += mulaw.len() as u64;
        if self.call.audio_stats.in_frames % 50 == 0 {
            self.snapshot_call();
        }

        let pcm8 = voice_transcoder::decode_mulaw(&mulaw);
        let pcm24 = voice_transcoder::upsample_8_to_24(&pcm8);
        let bytes = i16_slice_to_le_bytes(&pcm24);
        let audio_b64 = BASE64.encode(bytes);

        let _ = self
            .llm
            .outbound
            .send(LlmClientEvent::InputAudioBufferAppend { audio: audio_b64 })
            .await;
    }

    async fn handle_llm_event(&mut self, event: LlmServerEvent) {
        match event {
            LlmServerEvent::SessionCreated { .. } => {
                self.reconnect_attempt = 0;
                tracing::info!(call_id = %self.call.call_id, "LLM session created");
            }
            LlmServerEvent::SessionUpdated { .. } => {
                if !self.greeted {
                    self.greeted = true;
                    let _ = self.llm.outbound.send(LlmClientEvent::ResponseCreate).await;
                }
            }
            LlmServerEvent::SpeechStarted => self.apply_transition_with(SmEvent::LlmSpeechStarted).await,
            LlmServerEvent::SpeechStopped => self.apply_transition_with(SmEvent::LlmSpeechStopped).await,
            LlmServerEvent::AudioDelta { item_id, delta } => self.handle_audio_delta(item_id, delta).await,
            LlmServerEvent::AudioDone { .. } => self.apply_transition_with(SmEvent::LlmAudioDone).await,
            LlmServerEvent::AudioTranscriptDone { transcript, .. } => {
                self.log_transcript(TranscriptEntry::speech(TranscriptRole::Assistant, transcript));
            }
            LlmServerEvent::InputAudioTranscriptionCompleted { transcript, .. } => {
                self.log_transcript(TranscriptEntry::speech(TranscriptRole::User, transcript));
            }
            LlmServerEvent::FunctionCallArgumentsDone { call_id, name, arguments } => {
                self.dispatch_tool(call_id, name, arguments).await;
            }
            LlmServerEvent::ResponseDone { .. } | LlmServerEvent::RateLimitsUpdated { .. } => {}
            LlmServerEvent::Error { error } => {
                tracing::warn!(call_id = %self.call.call_id, %error, "LLM reported an error");
            }
            LlmServerEvent::Unknown => {
                tracing::debug!(call_id = %self.call.call_id, "ignoring unrecognized LLM event");
            }
        }
    }

    async fn handle_audio_delta(&mut self, item_id: String, delta_b64: String) {
        let pcm_bytes = match BASE64.decode(&delta_b64) {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(call_id = %self.call.call_id, error = %e, "bad base64 in audio delta");
                return;
            }
        };
        let samples = le_bytes_to_i16_slice(&pcm_bytes);
        let duration_ms = (samples.len() as u64 * 1000) / 24_000;

        self.apply_transition_with(SmEvent::LlmAudioDelta { item_id }).await;
        self.current_item_audio_ms += duration_ms;

        let pcm8 = voice_transcoder::downsample_24_to_8(&samples);
        let mulaw = voice_transcoder::encode_mulaw(&pcm8);
        self.call.audio_stats.out_frames += 1;
        self.call.audio_stats.out_bytes += mulaw.len() as u64;

        let out = TelephonyOutboundEvent::Media {
            stream_sid: self.stream_sid.clone(),
            media: OutboundMediaPayload {
                payload: BASE64.encode(mulaw),
            },
        };
        self.send_telephony(out).await;
    }

    /// Runs `event` through the pure state machine and executes every
    /// resulting side effect in order (clear-before-truncate, spec §8).
    async fn apply_transition_with(&mut self, event: SmEvent) {
        let (next_state, effects) = transition(
            self.call.conversation_state,
            event,
            self.call.current_response_item_id.as_deref(),
            self.current_item_audio_ms,
        );
        self.call.conversation_state = next_state;
        self.snapshot_call();

        for effect in effects {
            match effect {
                SideEffect::ClearTelephony => {
                    self.send_telephony(TelephonyOutboundEvent::Clear {
                        stream_sid: self.stream_sid.clone(),
                    })
                    .await;
                }
                SideEffect::CancelResponse => {
                    let _ = self.llm.outbound.send(LlmClientEvent::ResponseCancel).await;
                }
                SideEffect::TruncateItem { item_id, audio_end_ms } => {
                    let _ = self
                        .llm
                        .outbound
                        .send(LlmClientEvent::ConversationItemTruncate {
                            item_id,
                            content_index: 0,
                            audio_end_ms,
                        })
                        .await;
                }
                SideEffect::SetCurrentItem(id) => {
                    self.call.current_response_item_id = Some(id);
                    self.current_item_audio_ms = 0;
                }
                SideEffect::ClearCurrentItem => {
                    self.call.current_response_item_id = None;
                    self.current_item_audio_ms = 0;
                }
                SideEffect::DispatchTool | SideEffect::EmitToolOutputAndRespond => {
                    // Driven explicitly by dispatch_tool/handle_tool_outcome,
                    // which carry the call-id/arguments these effects lack.
                }
            }
        }
    }

    async fn dispatch_tool(&mut self, llm_call_id: String, name: String, arguments_json: String) {
        self.apply_transition_with(SmEvent::LlmFunctionCallArgumentsDone).await;

        let args: Value = serde_json::from_str(&arguments_json).unwrap_or(Value::Null);
        let dispatcher = self.state.dispatcher.clone();
        let session_cache = self.state.session_cache.clone();
        let bridge_call_id = self.call.call_id.clone();
        let tool_tx = self.tool_tx.clone();

        tokio::spawn(async move {
            let result = dispatcher.dispatch(&bridge_call_id, &name, args, &session_cache).await;
            let _ = tool_tx.send(ToolOutcome { llm_call_id, result }).await;
        });
    }

    async fn handle_tool_outcome(&mut self, outcome: ToolOutcome) {
        self.apply_transition_with(SmEvent::ToolResultDelivered).await;

        let output = serde_json::to_string(&outcome.result).unwrap_or_else(|_| "null".to_string());
        let _ = self
            .llm
            .outbound
            .send(LlmClientEvent::FunctionCallOutputCreate {
                item: FunctionCallOutputItem {
                    kind: "function_call_output".to_string(),
                    call_id: outcome.llm_call_id,
                    output,
                },
            })
            .await;
        let _ = self.llm.outbound.send(LlmClientEvent::ResponseCreate).await;
    }

    async fn handle_duration_ceiling(&mut self) {
        tracing::info!(call_id = %self.call.call_id, "duration ceiling reached, requesting wrap-up");
        let item = ConversationItemInput {
            kind: "message".to_string(),
            role: "user".to_string(),
            content: vec![ConversationContentInput {
                kind: "input_text".to_string(),
                text: "The call has reached its time limit. Please wrap up the conversation \
                       politely and end the call."
                    .to_string(),
            }],
        };
        let _ = self
            .llm
            .outbound
            .send(LlmClientEvent::ConversationItemCreate { item })
            .await;
        let _ = self.llm.outbound.send(LlmClientEvent::ResponseCreate).await;
    }

    async fn handle_llm_disconnect(&mut self) {
        if self.ended {
            return;
        }

        let backoff = ReconnectBackoff::new(self.config.llm.max_reconnect_attempts);
        self.reconnect_attempt += 1;
        if backoff.should_give_up(self.reconnect_attempt) {
            tracing::error!(call_id = %self.call.call_id, attempts = self.reconnect_attempt, "LLM reconnect exhausted");
            self.teardown(EndReason::LlmReconnectExhausted).await;
            return;
        }

        let delay = backoff.delay_for_attempt(self.reconnect_attempt);
        tracing::warn!(call_id = %self.call.call_id, attempt = self.reconnect_attempt, delay_secs = delay.as_secs(), "LLM disconnected, reconnecting");
        tokio::time::sleep(delay).await;

        let api_key = std::env::var(&self.config.llm.api_key_env).unwrap_or_default();
        match llm::connect(&self.config.llm, &api_key).await {
            Ok(conn) => {
                self.llm.close();
                self.llm = conn;
                self.greeted = false;
                if let Err(e) = self.send_session_update().await {
                    tracing::warn!(call_id = %self.call.call_id, error = %e, "failed to resend session.update after reconnect");
                }
            }
            Err(e) => {
                tracing::warn!(call_id = %self.call.call_id, error = %e, "reconnect attempt failed");
            }
        }
    }

    async fn send_session_update(&mut self) -> Result<()> {
        let tools = voice_booking::tool_definitions()
            .into_iter()
            .map(|t| ToolSpec {
                name: t.name.to_string(),
                description: t.description.to_string(),
                parameters: t.parameters,
            })
            .collect();

        let session = SessionConfig {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: None,
            voice: self.config.llm.voice.clone(),
            input_audio_format: "pcm16".to_string(),
            output_audio_format: "pcm16".to_string(),
            input_audio_transcription: InputAudioTranscription {
                model: "whisper-1".to_string(),
            },
            turn_detection: TurnDetection {
                kind: "server_vad".to_string(),
                threshold: self.config.llm.vad.threshold,
                prefix_padding_ms: self.config.llm.vad.prefix_padding_ms,
                silence_duration_ms: self.config.llm.vad.silence_duration_ms,
                create_response: true,
            },
            tools,
            tool_choice: "auto".to_string(),
            temperature: self.config.llm.temperature,
        };

        self.llm
            .outbound
            .send(LlmClientEvent::SessionUpdate { session })
            .await
            .map_err(|_| voice_domain::error::Error::Protocol("LLM outbound channel closed".into()))
    }

    async fn send_telephony(&mut self, event: TelephonyOutboundEvent) {
        let json = match serde_json::to_string(&event) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(call_id = %self.call.call_id, error = %e, "failed to serialize telephony frame");
                return;
            }
        };
        if self.telephony_sink.send(WsMessage::Text(json)).await.is_err() {
            tracing::warn!(call_id = %self.call.call_id, "telephony sink closed while sending");
        }
    }

    /// Fire-and-forget mirror of the Call record for external observers
    /// (spec §3 Ownership, the Session Cache's dashboard feed).
    fn snapshot_call(&self) {
        let cache = self.state.session_cache.clone();
        let call = self.call.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.upsert_call_snapshot(&call).await {
                tracing::warn!(call_id = %call.call_id, error = %e, "session cache snapshot write failed");
            }
        });
    }

    fn log_transcript(&self, entry: TranscriptEntry) {
        let cache = self.state.session_cache.clone();
        let call_id = self.call.call_id.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.append_transcript_entry(&call_id, &entry).await {
                tracing::warn!(call_id = %call_id, error = %e, "session cache write failed");
            }
        });
    }

    /// Idempotent: a second call is a no-op (spec §4.1 Teardown).
    async fn teardown(&mut self, reason: EndReason) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.call.status = CallStatus::Ended;
        self.call.conversation_state = ConversationState::Idle;

        let _ = self.telephony_sink.close().await;
        self.llm.close();
        self.snapshot_call();

        let reason_str = match reason {
            EndReason::TelephonyClosed => "telephony-closed",
            EndReason::LlmReconnectExhausted => "llm-reconnect-exhausted",
            EndReason::DurationCeiling => "duration-ceiling",
            EndReason::FatalError => "fatal-error",
        };
        tracing::info!(call_id = %self.call.call_id, reason = reason_str, "call ended");

        let cache = self.state.session_cache.clone();
        let call_id = self.call.call_id.clone();
        let reason_owned = reason_str.to_string();
        tokio::spawn(async move {
            if let Err(e) = cache.append_end_of_call(&call_id, &reason_owned, Value::Null).await {
                tracing::warn!(call_id = %call_id, error = %e, "session cache end-of-call write failed");
            }
        });
    }
}

fn i16_slice_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

fn le_bytes_to_i16_slice(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}
