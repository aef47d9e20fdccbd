//! WebSocket adapter
//!
//! The upgrade is always accepted; authentication happens on the open
//! socket so failures can be reported with a close code. Each socket gets a
//! writer task that drains its connection handle, and the read loop feeds
//! text frames to the session until the client leaves or goes idle.

use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message as WsMessage, Utf8Bytes, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use duet_auth::extract_bearer_token;

use crate::api::middleware::MessagingState;
use crate::domain::protocol::CloseReason;
use crate::service::{ConnectOptions, ConnectionHandle, Outbound};

/// How long a closing socket may take to flush queued frames
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    pub token: Option<String>,
    pub since: Option<i64>,
    #[serde(default)]
    pub foreground: bool,
}

/// Open the realtime channel for a pair
///
/// **GET /v1/pairs/{pair_id}/socket?token=&since=&foreground=**
pub async fn connect(
    ws: WebSocketUpgrade,
    State(state): State<MessagingState>,
    Path(pair_id): Path<String>,
    Query(params): Query<SocketParams>,
    headers: HeaderMap,
) -> Response {
    let token = params
        .token
        .clone()
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| extract_bearer_token(value).ok())
        })
        .unwrap_or_default();

    let options = ConnectOptions {
        since: params.since,
        foreground: params.foreground,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, pair_id, token, options))
}

async fn handle_socket(
    socket: WebSocket,
    state: MessagingState,
    pair_id: String,
    token: String,
    options: ConnectOptions,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (handle, mut outbound_rx) = ConnectionHandle::channel();

    let mut writer = tokio::spawn(async move {
        while let Some(item) = outbound_rx.recv().await {
            let result = match item {
                Outbound::Event(event) => match event.to_json() {
                    Ok(json) => ws_tx.send(WsMessage::Text(json.into())).await,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize server event");
                        continue;
                    }
                },
                Outbound::Close(reason) => {
                    let frame = CloseFrame {
                        code: reason.code(),
                        reason: Utf8Bytes::from_static(reason.reason()),
                    };
                    let _ = ws_tx.send(WsMessage::Close(Some(frame))).await;
                    break;
                }
            };

            if result.is_err() {
                tracing::debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    let session = state
        .gateway
        .connect(&pair_id, &token, handle, options)
        .await;

    if let Ok(mut session) = session {
        let idle_timeout = state.settings.idle_timeout;

        loop {
            let next = match tokio::time::timeout(idle_timeout, ws_rx.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::info!(
                        pair_id = %pair_id,
                        participant_id = %session.participant_id(),
                        "Closing idle socket"
                    );
                    session.close(CloseReason::IdleTimeout);
                    break;
                }
            };

            match next {
                Some(Ok(WsMessage::Text(text))) => {
                    // Errors were already reported to the client as events
                    let _ = session.handle_text(text.as_str()).await;
                    if !session.is_active() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    session.transport_closed();
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "WebSocket receive failed");
                    session.transport_closed();
                    break;
                }
            }
        }
    }

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }
}
