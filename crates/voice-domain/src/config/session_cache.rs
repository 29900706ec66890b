use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session Cache adapter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCacheConfig {
    /// SESSION_CACHE_URL.
    #[serde(default = "d_url")]
    pub url: String,
    /// Capacity of the fire-and-forget write channel before writes are dropped.
    #[serde(default = "d_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SessionCacheConfig {
    fn default() -> Self {
        Self {
            url: d_url(),
            channel_capacity: d_channel_capacity(),
        }
    }
}

fn d_url() -> String {
    "http://127.0.0.1:6379".into()
}
fn d_channel_capacity() -> usize {
    1024
}
