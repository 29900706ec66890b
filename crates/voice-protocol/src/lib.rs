//! Wire types for the two peer connections the Stream Bridge owns: the
//! telephony media stream and the LLM realtime protocol (spec §6).

pub mod llm;
pub mod telephony;

pub use llm::{LlmClientEvent, LlmServerEvent, SessionConfig};
pub use telephony::{TelephonyEvent, TelephonyOutboundEvent};
