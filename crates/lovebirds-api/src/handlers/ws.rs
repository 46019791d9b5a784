//! WebSocket (streaming transport) handler.

use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use lovebirds_core::config::TransportKind;
use lovebirds_core::error::AppError;
use lovebirds_realtime::message::types::{InboundMessage, OutboundMessage};

use crate::state::AppState;

type WsSink = SplitSink<WebSocket, Message>;

/// GET {path}/ws
///
/// WebSocket upgrade.
///
/// The credential travels in the first frame (`auth {token}`), never in
/// the URL or headers.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max = state.config.realtime.max_message_size;
    ws.max_message_size(max)
        .on_upgrade(move |socket| handle_socket(state, socket))
}

/// Runs one WebSocket from handshake to close.
async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let timeout = Duration::from_secs(state.config.realtime.handshake_timeout_seconds);
    let token = match tokio::time::timeout(timeout, read_auth(&mut ws_rx)).await {
        Ok(Ok(token)) => token,
        Ok(Err(e)) => {
            reject(&mut ws_tx, &e).await;
            return;
        }
        Err(_) => {
            reject(&mut ws_tx, &AppError::transport("Handshake timed out")).await;
            return;
        }
    };

    let (handle, mut outbound_rx) = match state
        .realtime
        .gateway
        .connect(&token, TransportKind::Websocket)
        .await
    {
        Ok(admitted) => admitted,
        Err(e) => {
            reject(&mut ws_tx, &e).await;
            return;
        }
    };

    let conn_id = handle.id;
    info!(conn_id = %conn_id, user_id = %handle.user_id, "WebSocket channel established");

    // Outbound forwarder; flushes whatever is queued once the channel closes.
    let writer_handle = handle.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = outbound_rx.recv() => match msg {
                    Some(msg) => {
                        if !send_event(&mut ws_tx, &msg).await {
                            break;
                        }
                    }
                    None => break,
                },
                _ = writer_handle.closed() => {
                    while let Ok(msg) = outbound_rx.try_recv() {
                        if !send_event(&mut ws_tx, &msg).await {
                            break;
                        }
                    }
                    break;
                }
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    let reason = loop {
        let frame = tokio::select! {
            _ = handle.closed() => break "server closed",
            frame = ws_rx.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                state
                    .realtime
                    .connections
                    .handle_inbound(&handle, text.as_str())
                    .await;
            }
            Some(Ok(Message::Pong(_))) | Some(Ok(Message::Ping(_))) => handle.touch().await,
            Some(Ok(Message::Close(_))) | None => break "client closed",
            Some(Ok(Message::Binary(_))) => {
                handle.send(OutboundMessage::error(&AppError::validation(
                    "Binary frames are not supported",
                )));
            }
            Some(Err(e)) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket transport error");
                break "transport error";
            }
        }
    };

    state.realtime.connections.close(&conn_id, reason).await;
    if writer.await.is_err() {
        debug!(conn_id = %conn_id, "WebSocket writer task ended abnormally");
    }

    info!(conn_id = %conn_id, reason, "WebSocket channel closed");
}

/// Waits for the `auth` event that must open every streaming channel.
async fn read_auth(ws_rx: &mut SplitStream<WebSocket>) -> Result<String, AppError> {
    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                return match serde_json::from_str::<InboundMessage>(text.as_str()) {
                    Ok(InboundMessage::Auth { token }) => Ok(token),
                    Ok(other) => Err(AppError::validation(format!(
                        "Expected auth event, got {}",
                        other.name()
                    ))),
                    Err(e) => Err(AppError::validation(format!("Invalid auth event: {e}"))),
                };
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Binary(_)) => {
                return Err(AppError::validation("Binary frames are not supported"));
            }
            Ok(Message::Close(_)) => break,
            Err(e) => return Err(AppError::transport(format!("Handshake read failed: {e}"))),
        }
    }
    Err(AppError::transport("Socket closed during handshake"))
}

/// Sends `connectError` and closes the socket.
async fn reject(ws_tx: &mut WsSink, err: &AppError) {
    debug!(error = %err, "Rejecting WebSocket handshake");
    send_event(ws_tx, &OutboundMessage::connect_error(err)).await;
    let _ = ws_tx.send(Message::Close(None)).await;
}

async fn send_event(ws_tx: &mut WsSink, msg: &OutboundMessage) -> bool {
    match msg.to_json() {
        Ok(json) => ws_tx.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize outbound event");
            true
        }
    }
}
