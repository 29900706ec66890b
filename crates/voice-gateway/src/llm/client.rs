//! Outbound LLM realtime connection: one per call, owned by the Bridge.
//!
//! Mirrors the shape of the teacher's node client — connect, split into
//! sink/stream, spawn a writer task and a reader task, and hand the caller
//! a channel pair instead of the raw socket halves (Design Note "Back-
//! reference from LLM to Bridge": the adapter exposes an event channel the
//! Bridge reads, instead of the Bridge being threaded into the socket code).

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;

use voice_domain::config::LlmConfig;
use voice_domain::error::{Error, Result};
use voice_protocol::llm::{LlmClientEvent, LlmServerEvent};

/// Channel pair the Bridge reads/writes instead of owning the raw socket.
pub struct LlmConnection {
    pub outbound: mpsc::Sender<LlmClientEvent>,
    pub inbound: mpsc::Receiver<LlmServerEvent>,
    reader_handle: tokio::task::JoinHandle<()>,
    writer_handle: tokio::task::JoinHandle<()>,
}

impl LlmConnection {
    /// Aborts the reader and writer tasks, which drops their half of the
    /// split socket and closes the underlying connection. Dropping
    /// `outbound` alone is not enough: `split()` halves share one
    /// connection, so the reader stays parked on `stream.next()` until the
    /// remote end acts unless its task is aborted directly.
    pub fn close(&self) {
        self.writer_handle.abort();
        self.reader_handle.abort();
    }
}

/// Connect, perform the WebSocket handshake within `handshake_timeout`, and
/// spawn the reader/writer tasks. Does not wait for `session.created` —
/// that is the caller's job (the reconnect counter only resets on it).
pub async fn connect(config: &LlmConfig, api_key: &str) -> Result<LlmConnection> {
    let url = format!("{}?model={}", config.realtime_url, config.model);
    let mut request = url
        .into_client_request()
        .map_err(|e| Error::Protocol(format!("building LLM request: {e}")))?;
    request.headers_mut().insert(
        AUTHORIZATION,
        format!("Bearer {api_key}")
            .parse()
            .map_err(|e| Error::Protocol(format!("invalid auth header: {e}")))?,
    );

    let handshake = Duration::from_millis(config.handshake_timeout_ms);
    let (ws_stream, _response) = tokio::time::timeout(handshake, tokio_tungstenite::connect_async(request))
        .await
        .map_err(|_| Error::Protocol("LLM handshake timed out".into()))?
        .map_err(|e| Error::Protocol(format!("LLM connect failed: {e}")))?;

    let (mut sink, mut stream) = ws_stream.split();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<LlmClientEvent>(64);
    let (inbound_tx, inbound_rx) = mpsc::channel::<LlmServerEvent>(256);

    let writer_handle = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize outbound LLM event");
                    continue;
                }
            };
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let reader_handle = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<LlmServerEvent>(&text) {
                    Ok(event) => {
                        if inbound_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "unparseable LLM server event"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "LLM socket read error");
                    break;
                }
            }
        }
    });

    Ok(LlmConnection {
        outbound: outbound_tx,
        inbound: inbound_rx,
        reader_handle,
        writer_handle,
    })
}
