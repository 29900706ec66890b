//! Tool Dispatcher: synchronous, transactional execution of the two
//! LLM-callable functions (spec §4.3, §9 "Polymorphism over the tool set").
//!
//! New tools are added by registering a new [`ToolName`] variant and a match
//! arm in [`ToolDispatcher::dispatch`] — no dynamic reflection.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde_json::{json, Value};

use voice_domain::call::ToolCall;
use voice_domain::session_cache::SessionCache;

use crate::store::{BookingStore, CreateAppointmentOutcome, CreateAppointmentRequest};

/// The tagged variant of callable tools. New tools register a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    ListAvailableSlots,
    CreateAppointment,
}

impl ToolName {
    pub fn from_str(name: &str) -> Option<Self> {
        match name {
            "list_available_slots" => Some(Self::ListAvailableSlots),
            "create_appointment" => Some(Self::CreateAppointment),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListAvailableSlots => "list_available_slots",
            Self::CreateAppointment => "create_appointment",
        }
    }
}

/// Static tool metadata for building the LLM session's tool list (spec §6).
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_available_slots",
            description: "List open appointment slots for a given date (YYYY-MM-DD).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "date": {"type": "string", "description": "YYYY-MM-DD"}
                },
                "required": ["date"]
            }),
        },
        ToolDefinition {
            name: "create_appointment",
            description: "Book an appointment for a customer at a given date and time slot.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "customer_name": {"type": "string"},
                    "date": {"type": "string", "description": "YYYY-MM-DD"},
                    "time": {"type": "string", "description": "e.g. \"10:30 AM\""},
                    "phone": {"type": "string"}
                },
                "required": ["customer_name", "date", "time", "phone"]
            }),
        },
    ]
}

/// Stateless dispatcher delegating to the Booking Store. Safe to share
/// across calls: `BookingStore` clones share the underlying connection pool.
pub struct ToolDispatcher {
    store: BookingStore,
}

impl ToolDispatcher {
    pub fn new(store: BookingStore) -> Self {
        Self { store }
    }

    /// Execute `name` with `arguments`, logging the call (with latency) to
    /// the Session Cache. Never propagates an error to the caller: any
    /// failure is translated into a JSON error discriminator so the LLM can
    /// verbalize it (spec §4.3, §7).
    pub async fn dispatch(
        &self,
        call_id: &str,
        name: &str,
        arguments: Value,
        session_cache: &Arc<dyn SessionCache>,
    ) -> Value {
        let started = Instant::now();
        let result = self.execute(name, &arguments).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Err(e) = session_cache
            .append_transcript_entry(
                call_id,
                &voice_domain::call::TranscriptEntry::tool_call(name, arguments.clone()),
            )
            .await
        {
            tracing::warn!(error = %e, "session cache write failed (tool-call entry)");
        }
        if let Err(e) = session_cache
            .append_transcript_entry(
                call_id,
                &voice_domain::call::TranscriptEntry::tool_result(name, result.clone()),
            )
            .await
        {
            tracing::warn!(error = %e, "session cache write failed (tool-result entry)");
        }
        let tool_call = ToolCall {
            name: name.to_string(),
            arguments,
            result: result.clone(),
            instant: chrono::Utc::now(),
            duration_ms,
        };
        if let Err(e) = session_cache.append_tool_call(call_id, &tool_call).await {
            tracing::warn!(error = %e, "session cache write failed (tool-call metric)");
        }

        result
    }

    async fn execute(&self, name: &str, arguments: &Value) -> Value {
        let Some(tool) = ToolName::from_str(name) else {
            return json!({"error": true, "message": format!("unknown tool: {name}")});
        };

        match tool {
            ToolName::ListAvailableSlots => self.list_available_slots(arguments).await,
            ToolName::CreateAppointment => self.create_appointment(arguments).await,
        }
    }

    async fn list_available_slots(&self, arguments: &Value) -> Value {
        let date_str = match arguments.get("date").and_then(Value::as_str) {
            Some(d) => d,
            None => return json!({"error": true, "message": "missing required field: date"}),
        };
        let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => return json!({"error": true, "message": "invalid date format, expected YYYY-MM-DD"}),
        };

        match self.store.available_slots(date).await {
            Ok(slots) => json!({ "available_slots": slots }),
            Err(e) => {
                tracing::error!(error = %e, "list_available_slots failed");
                json!({"error": true, "message": "could not look up availability right now"})
            }
        }
    }

    async fn create_appointment(&self, arguments: &Value) -> Value {
        let customer_name = match arguments.get("customer_name").and_then(Value::as_str) {
            Some(v) => v.to_string(),
            None => return json!({"success": false, "error": "missing required field: customer_name"}),
        };
        let phone = match arguments.get("phone").and_then(Value::as_str) {
            Some(v) => v.to_string(),
            None => return json!({"success": false, "error": "missing required field: phone"}),
        };
        let date_str = match arguments.get("date").and_then(Value::as_str) {
            Some(v) => v,
            None => return json!({"success": false, "error": "missing required field: date"}),
        };
        let time_label = match arguments.get("time").and_then(Value::as_str) {
            Some(v) => v.to_string(),
            None => return json!({"success": false, "error": "missing required field: time"}),
        };
        let call_sid = arguments
            .get("call_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                return json!({"success": false, "error": "invalid date format, expected YYYY-MM-DD"})
            }
        };

        let req = CreateAppointmentRequest {
            customer_name,
            phone_number: phone,
            date,
            time_label,
            call_sid,
        };

        match self.store.create_appointment(req).await {
            Ok(CreateAppointmentOutcome::Success { confirmation_number }) => {
                json!({ "success": true, "confirmation_number": confirmation_number })
            }
            Ok(CreateAppointmentOutcome::SlotTaken) => {
                json!({ "success": false, "error": "slot_taken" })
            }
            Err(e) => {
                tracing::error!(error = %e, "create_appointment failed");
                json!({ "error": true, "message": "could not complete the booking right now" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_domain::session_cache::InMemorySessionCache;

    async fn dispatcher() -> ToolDispatcher {
        let store = BookingStore::connect_in_memory().await.unwrap();
        ToolDispatcher::new(store)
    }

    #[tokio::test]
    async fn weekend_query_via_dispatch_returns_empty_list() {
        let d = dispatcher().await;
        let cache: Arc<dyn SessionCache> = Arc::new(InMemorySessionCache::new());
        let result = d
            .dispatch(
                "C1",
                "list_available_slots",
                json!({"date": "2026-02-14"}),
                &cache,
            )
            .await;
        assert_eq!(result, json!({"available_slots": []}));
    }

    #[tokio::test]
    async fn booking_then_duplicate_booking_yields_success_then_slot_taken() {
        let d = dispatcher().await;
        let cache: Arc<dyn SessionCache> = Arc::new(InMemorySessionCache::new());

        let args = json!({
            "customer_name": "Alice",
            "date": "2026-02-10",
            "time": "10:30 AM",
            "phone": "+15550100",
            "call_id": "C1"
        });

        let first = d.dispatch("C1", "create_appointment", args.clone(), &cache).await;
        assert_eq!(first["success"], true);
        assert!(first["confirmation_number"].as_str().unwrap().starts_with("APT-"));

        let second = d.dispatch("C1", "create_appointment", args, &cache).await;
        assert_eq!(second, json!({"success": false, "error": "slot_taken"}));
    }

    #[tokio::test]
    async fn unknown_tool_returns_error_discriminator() {
        let d = dispatcher().await;
        let cache: Arc<dyn SessionCache> = Arc::new(InMemorySessionCache::new());
        let result = d.dispatch("C1", "delete_database", json!({}), &cache).await;
        assert_eq!(result["error"], true);
    }

    #[tokio::test]
    async fn each_dispatch_logs_tool_call_and_result_to_session_cache() {
        let d = dispatcher().await;
        let cache = Arc::new(InMemorySessionCache::new());
        let dyn_cache: Arc<dyn SessionCache> = cache.clone();
        d.dispatch("C1", "list_available_slots", json!({"date": "2026-02-10"}), &dyn_cache)
            .await;
        assert_eq!(cache.transcript.lock().unwrap().len(), 2); // tool-call + tool-result
        assert_eq!(cache.tool_calls.lock().unwrap().len(), 1);
    }
}
