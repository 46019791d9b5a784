//! Transport negotiation.

use axum::Json;
use axum::extract::State;

use crate::dto::response::NegotiateResponse;
use crate::state::AppState;

/// GET {path}/negotiate
///
/// Enabled transports and timing parameters.
///
/// Clients try the first transport and fall back down the list.
pub async fn negotiate(State(state): State<AppState>) -> Json<NegotiateResponse> {
    let realtime = &state.config.realtime;
    Json(NegotiateResponse {
        path: realtime.handshake_path.clone(),
        transports: realtime.transports.clone(),
        ping_interval_seconds: realtime.ping_interval_seconds,
        ping_timeout_seconds: realtime.ping_timeout_seconds,
        poll_wait_seconds: realtime.poll_wait_seconds,
        reconnect: realtime.reconnect.clone(),
    })
}
