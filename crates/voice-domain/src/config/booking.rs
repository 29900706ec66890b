use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Booking Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// DATABASE_PATH.
    #[serde(default = "d_path")]
    pub database_path: String,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            database_path: d_path(),
        }
    }
}

fn d_path() -> String {
    "./data/appointments.db".into()
}
