mod booking;
mod call;
mod llm;
mod log;
mod server;
mod session_cache;

pub use booking::*;
pub use call::*;
pub use llm::*;
pub use log::*;
pub use server::*;
pub use session_cache::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub call: CallConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub session_cache: SessionCacheConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load from a TOML file, falling back to defaults if the file is absent.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| crate::error::Error::Config(e.to_string()))
    }

    /// Apply the environment-variable overrides named in spec §6.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("LLM_REALTIME_MODEL") {
            self.llm.model = model;
        }
        if let Ok(voice) = std::env::var("LLM_VOICE") {
            self.llm.voice = voice;
        }
        if let Ok(url) = std::env::var("SESSION_CACHE_URL") {
            self.session_cache.url = url;
        }
        if let Ok(path) = std::env::var("DATABASE_PATH") {
            self.booking.database_path = path;
        }
        if let Ok(minutes) = std::env::var("MAX_CALL_DURATION_MINUTES") {
            if let Ok(n) = minutes.parse() {
                self.call.max_duration_minutes = n;
            }
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.log.level = level;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(n) = port.parse() {
                self.server.port = n;
            }
        }
    }

    /// Validate cross-field invariants. Errors abort startup; warnings are logged.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.call.max_duration_minutes == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "call.max_duration_minutes".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.llm.max_reconnect_attempts == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "llm.max_reconnect_attempts".into(),
                message: "zero means the call ends on the first LLM disconnect".into(),
            });
        }
        if std::env::var(&self.llm.api_key_env).is_err() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "llm.api_key_env".into(),
                message: format!(
                    "environment variable {} is unset; LLM connections will fail",
                    self.llm.api_key_env
                ),
            });
        }

        issues
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = Config::default();
        assert_eq!(cfg.call.max_duration_minutes, 5);
        assert_eq!(cfg.llm.max_reconnect_attempts, 3);
        assert_eq!(cfg.llm.vad.threshold, 0.5);
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("MAX_CALL_DURATION_MINUTES", "9");
        let mut cfg = Config::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.call.max_duration_minutes, 9);
        std::env::remove_var("MAX_CALL_DURATION_MINUTES");
    }

    #[test]
    fn zero_duration_is_an_error() {
        let mut cfg = Config::default();
        cfg.call.max_duration_minutes = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.field == "call.max_duration_minutes"));
    }
}
