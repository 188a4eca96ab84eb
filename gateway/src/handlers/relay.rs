//! Relay WebSocket handler
//!
//! Accepts a client connection at `/ws`, opens one Hume EVI session for it,
//! and hands both sides to [`Relay::run`] in a task of their own.

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures::{Sink, SinkExt, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::core::relay::{CLIENT_CLOSE_TIMEOUT, Relay};
use crate::errors::RelayError;
use crate::state::AppState;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Close reason sent when the upstream session cannot be opened.
const UPSTREAM_UNAVAILABLE: &str = "upstream unavailable";

/// Relay WebSocket handler
///
/// Upgrades the HTTP connection and starts a relay session. Every session gets
/// a fresh v4 UUID that tags all of its log lines.
pub async fn relay_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let session_id = Uuid::new_v4().to_string();
    info!(session_id = %session_id, "Relay WebSocket upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| {
            let span = info_span!("relay_session", session_id = %session_id);
            handle_relay_socket(socket, state, session_id).instrument(span)
        })
}

async fn handle_relay_socket(socket: WebSocket, state: Arc<AppState>, session_id: String) {
    let relay = Relay::new(session_id);
    let (mut client_tx, client_rx) = socket.split();

    let config = &state.config;
    let upstream = match state
        .connector
        .open(&config.hume_config_id, &config.hume_secret_key)
        .await
    {
        Ok(upstream) => upstream,
        Err(e) => {
            let err = RelayError::UpstreamConnectFailed(e);
            error!(provider = state.connector.provider_name(), "{}", err);
            reject_client(&mut client_tx).await;
            relay.abandon();
            return;
        }
    };

    info!(
        provider = state.connector.provider_name(),
        "Upstream session opened"
    );

    let task = tokio::spawn(
        async move { relay.run(client_rx, client_tx, upstream).await }.instrument(Span::current()),
    );

    match task.await {
        Ok(outcome) => {
            let chat_id = outcome.metadata.chat_id.as_deref().unwrap_or("");
            let chat_group_id = outcome.metadata.chat_group_id.as_deref().unwrap_or("");
            if outcome.reason.is_normal_close() {
                info!(reason = %outcome.reason, chat_id, chat_group_id, "Relay session finished");
            } else {
                warn!(
                    reason = %outcome.reason,
                    chat_id,
                    chat_group_id,
                    "Relay session ended with error"
                );
            }
        }
        Err(e) if e.is_panic() => {
            error!("Relay task panicked: {}", e);
        }
        Err(e) => {
            warn!("Relay task cancelled: {}", e);
        }
    }
}

/// Close the client with 1011 after a failed upstream open.
async fn reject_client<K>(client_tx: &mut K)
where
    K: Sink<Message> + Unpin,
    K::Error: fmt::Display,
{
    let frame = CloseFrame {
        code: close_code::ERROR,
        reason: UPSTREAM_UNAVAILABLE.into(),
    };

    let closed = timeout(CLIENT_CLOSE_TIMEOUT, async {
        if let Err(e) = client_tx.send(Message::Close(Some(frame))).await {
            debug!("Close frame not delivered: {}", e);
        }
        if let Err(e) = client_tx.close().await {
            debug!("Client sink close: {}", e);
        }
    })
    .await;

    if closed.is_err() {
        warn!("Timed out closing client after upstream failure");
    }
}
