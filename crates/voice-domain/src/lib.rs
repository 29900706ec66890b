pub mod call;
pub mod config;
pub mod error;
pub mod session_cache;

pub use call::{AudioStats, Call, CallStatus, ConversationState, EndReason, ToolCall, TranscriptEntry, TranscriptRole};
pub use config::Config;
pub use error::{Error, Result};
