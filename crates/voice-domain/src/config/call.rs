use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Call-duration ceiling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// MAX_CALL_DURATION_MINUTES.
    #[serde(default = "d_max_minutes")]
    pub max_duration_minutes: u64,
    /// Grace period between the wrap-up `response.create` and the hard cut.
    #[serde(default = "d_grace_secs")]
    pub hard_cut_grace_seconds: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            max_duration_minutes: d_max_minutes(),
            hard_cut_grace_seconds: d_grace_secs(),
        }
    }
}

fn d_max_minutes() -> u64 {
    5
}
fn d_grace_secs() -> u64 {
    15
}
