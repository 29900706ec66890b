pub mod client;
pub mod reconnect;

pub use client::{connect, LlmConnection};
pub use reconnect::ReconnectBackoff;
