//! Session Cache adapter.
//!
//! The Session Cache itself is an external K/V store with TTL (out of scope
//! per spec §1); this module is the interface the core codes against plus a
//! channel-backed implementation that never blocks the audio path (spec §9,
//! "Fire-and-forget writes").

mod channel;
mod memory;

pub use channel::ChannelSessionCache;
pub use memory::InMemorySessionCache;

use async_trait::async_trait;
use serde_json::Value;

use crate::call::{Call, ToolCall, TranscriptEntry};
use crate::error::Result;

/// What the core writes to the Session Cache. Writes are idempotent
/// upserts/appends (spec §5, shared resources (b)).
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Mirror a snapshot of the Call record for external observers (e.g. the
    /// dashboard's SSE feed).
    async fn upsert_call_snapshot(&self, call: &Call) -> Result<()>;

    /// Append one transcript line. Monotonic by instant per call-id.
    async fn append_transcript_entry(&self, call_id: &str, entry: &TranscriptEntry) -> Result<()>;

    /// Append a completed tool call with its latency.
    async fn append_tool_call(&self, call_id: &str, tool_call: &ToolCall) -> Result<()>;

    /// Append exactly one end-of-call record per call-id.
    async fn append_end_of_call(&self, call_id: &str, reason: &str, extra: Value) -> Result<()>;
}
