use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::call::{Call, ToolCall, TranscriptEntry};
use crate::error::Result;

use super::SessionCache;

/// In-memory test double for [`SessionCache`]. Not for production use.
#[derive(Default)]
pub struct InMemorySessionCache {
    pub snapshots: Mutex<Vec<Call>>,
    pub transcript: Mutex<Vec<(String, TranscriptEntry)>>,
    pub tool_calls: Mutex<Vec<(String, ToolCall)>>,
    pub end_of_call: Mutex<Vec<(String, String)>>,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn upsert_call_snapshot(&self, call: &Call) -> Result<()> {
        self.snapshots.lock().unwrap().push(call.clone());
        Ok(())
    }

    async fn append_transcript_entry(&self, call_id: &str, entry: &TranscriptEntry) -> Result<()> {
        self.transcript
            .lock()
            .unwrap()
            .push((call_id.to_string(), entry.clone()));
        Ok(())
    }

    async fn append_tool_call(&self, call_id: &str, tool_call: &ToolCall) -> Result<()> {
        self.tool_calls
            .lock()
            .unwrap()
            .push((call_id.to_string(), tool_call.clone()));
        Ok(())
    }

    async fn append_end_of_call(&self, call_id: &str, reason: &str, _extra: Value) -> Result<()> {
        self.end_of_call
            .lock()
            .unwrap()
            .push((call_id.to_string(), reason.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::TranscriptRole;

    #[tokio::test]
    async fn records_each_write_kind() {
        let cache = InMemorySessionCache::new();
        let call = Call::new("C1", "S1", None);
        cache.upsert_call_snapshot(&call).await.unwrap();
        cache
            .append_transcript_entry(
                "C1",
                &TranscriptEntry::speech(TranscriptRole::User, "hello"),
            )
            .await
            .unwrap();
        cache
            .append_end_of_call("C1", "telephony-closed", Value::Null)
            .await
            .unwrap();

        assert_eq!(cache.snapshots.lock().unwrap().len(), 1);
        assert_eq!(cache.transcript.lock().unwrap().len(), 1);
        assert_eq!(cache.end_of_call.lock().unwrap().len(), 1);
    }
}
