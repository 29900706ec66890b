use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Logging
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// LOG_LEVEL — passed straight to `tracing_subscriber::EnvFilter` when
    /// `RUST_LOG` is unset.
    #[serde(default = "d_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: d_level() }
    }
}

fn d_level() -> String {
    "info".into()
}
