use std::sync::Arc;

use voice_booking::ToolDispatcher;
use voice_domain::config::Config;
use voice_domain::session_cache::SessionCache;

/// Shared application state passed to the axum handlers. Grouped by
/// concern the way the teacher's `AppState` is (spec §2.1).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<ToolDispatcher>,
    pub session_cache: Arc<dyn SessionCache>,
}
