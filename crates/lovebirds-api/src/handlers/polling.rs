//! HTTP long-polling fallback transport.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::{debug, info};

use lovebirds_core::config::TransportKind;
use lovebirds_core::error::AppError;
use lovebirds_core::types::ChannelId;
use lovebirds_realtime::message::types::OutboundMessage;
use lovebirds_realtime::transport::polling::PollingChannel;

use crate::dto::request::{PollHandshakeRequest, PollPayload};
use crate::dto::response::{ApiResponse, PollHandshakeResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST {path}/poll
///
/// Polling handshake with the auth payload as body.
pub async fn poll_handshake(
    State(state): State<AppState>,
    Json(req): Json<PollHandshakeRequest>,
) -> Result<Json<ApiResponse<PollHandshakeResponse>>, ApiError> {
    let (handle, receiver) = state
        .realtime
        .gateway
        .connect(&req.token, TransportKind::Polling)
        .await?;

    let poll_wait_seconds = state.config.realtime.poll_wait_seconds;
    state
        .realtime
        .polling
        .insert(handle.clone(), receiver, Duration::from_secs(poll_wait_seconds));

    info!(conn_id = %handle.id, user_id = %handle.user_id, "Polling channel established");

    Ok(Json(ApiResponse::ok(PollHandshakeResponse {
        channel_id: handle.id,
        user_id: handle.user_id,
        poll_wait_seconds,
    })))
}

/// GET {path}/poll/{channel_id}
///
/// Long-poll for queued events.
///
/// Holds the request until an event is queued or the wait elapses. The
/// final poll after a close returns the closing events; later polls 404.
pub async fn poll(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
) -> Result<Json<Vec<OutboundMessage>>, ApiError> {
    let channel = lookup(&state, &channel_id)?;
    let wait = Duration::from_secs(state.config.realtime.poll_wait_seconds);

    let events = channel.drain(wait).await;
    if !channel.handle().is_alive() {
        state.realtime.polling.remove(&channel_id);
        debug!(conn_id = %channel_id, "Delivered final events of closed polling channel");
    }

    Ok(Json(events))
}

/// POST {path}/poll/{channel_id}
///
/// Submit one event or a batch.
pub async fn poll_send(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
    Json(payload): Json<PollPayload>,
) -> Result<StatusCode, ApiError> {
    let channel = lookup(&state, &channel_id)?;
    let handle = channel.handle();
    if !handle.is_alive() {
        return Err(AppError::not_found(format!("Channel {channel_id} is closed")).into());
    }

    handle.touch().await;
    for event in payload.into_events() {
        state.realtime.connections.handle_message(handle, event).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE {path}/poll/{channel_id}
///
/// Voluntary close.
pub async fn poll_close(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
) -> Result<StatusCode, ApiError> {
    lookup(&state, &channel_id)?;
    state.realtime.polling.remove(&channel_id);
    state.realtime.connections.close(&channel_id, "client closed").await;
    Ok(StatusCode::NO_CONTENT)
}

fn lookup(state: &AppState, channel_id: &ChannelId) -> Result<Arc<PollingChannel>, ApiError> {
    state
        .realtime
        .polling
        .get(channel_id)
        .ok_or_else(|| AppError::not_found(format!("Unknown channel {channel_id}")).into())
}
