use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::call::{Call, ToolCall, TranscriptEntry};
use crate::error::Result;

use super::SessionCache;

/// One write destined for the background drain worker.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum CacheWrite {
    CallSnapshot { call_id: String, payload: Value },
    TranscriptEntry { call_id: String, entry: Value },
    ToolCall { call_id: String, tool_call: Value },
    EndOfCall { call_id: String, reason: String, extra: Value },
}

/// Channel-backed [`SessionCache`]. Producers never await the sink; the
/// bounded channel enforces backpressure is simply dropped, never applied to
/// the audio path (spec §9 Design Notes).
pub struct ChannelSessionCache {
    tx: mpsc::Sender<CacheWrite>,
    dropped_writes: Arc<AtomicU64>,
}

impl ChannelSessionCache {
    /// Spawn the drain worker that POSTs each write to `base_url` via `reqwest`.
    /// `capacity` bounds the channel; overflow increments `dropped_writes`.
    pub fn spawn(base_url: String, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<CacheWrite>(capacity);
        let dropped_writes = Arc::new(AtomicU64::new(0));

        tokio::spawn(async move {
            let client = reqwest::Client::new();
            while let Some(write) = rx.recv().await {
                let url = format!("{base_url}/sessions/events");
                if let Err(e) = client.post(&url).json(&write).send().await {
                    tracing::warn!(error = %e, "session cache write failed");
                }
            }
        });

        Self { tx, dropped_writes }
    }

    /// Number of writes dropped because the channel was full.
    pub fn dropped_writes(&self) -> u64 {
        self.dropped_writes.load(Ordering::Relaxed)
    }

    fn enqueue(&self, write: CacheWrite) {
        if self.tx.try_send(write).is_err() {
            self.dropped_writes.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("session cache channel full, dropping write");
        }
    }
}

#[async_trait]
impl SessionCache for ChannelSessionCache {
    async fn upsert_call_snapshot(&self, call: &Call) -> Result<()> {
        self.enqueue(CacheWrite::CallSnapshot {
            call_id: call.call_id.clone(),
            payload: serde_json::to_value(call)?,
        });
        Ok(())
    }

    async fn append_transcript_entry(&self, call_id: &str, entry: &TranscriptEntry) -> Result<()> {
        self.enqueue(CacheWrite::TranscriptEntry {
            call_id: call_id.to_string(),
            entry: serde_json::to_value(entry)?,
        });
        Ok(())
    }

    async fn append_tool_call(&self, call_id: &str, tool_call: &ToolCall) -> Result<()> {
        self.enqueue(CacheWrite::ToolCall {
            call_id: call_id.to_string(),
            tool_call: serde_json::to_value(tool_call)?,
        });
        Ok(())
    }

    async fn append_end_of_call(&self, call_id: &str, reason: &str, extra: Value) -> Result<()> {
        self.enqueue(CacheWrite::EndOfCall {
            call_id: call_id.to_string(),
            reason: reason.to_string(),
            extra,
        });
        Ok(())
    }
}
