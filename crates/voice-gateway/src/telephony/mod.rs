//! Telephony Media Stream listener: the axum side of the dual-socket
//! Bridge (spec §2.1). One WebSocket upgrade spawns one [`crate::bridge`]
//! task; the handler itself holds no state beyond the initial handoff.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::bridge;
use crate::state::AppState;

pub async fn media_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        bridge::run(socket, state).await;
    })
}

pub async fn healthz() -> &'static str {
    "ok"
}
