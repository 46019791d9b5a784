//! Route definitions.
//!
//! The channel endpoints live under the configured versioned path so every
//! instance behind a router agrees on them; health lives under `/api`.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.realtime.max_message_size;
    let path = state
        .config
        .realtime
        .handshake_path
        .trim_end_matches('/')
        .to_string();

    let channel_routes = Router::new()
        .route("/negotiate", get(handlers::negotiate::negotiate))
        .route("/ws", get(handlers::ws::ws_upgrade))
        .route("/poll", post(handlers::polling::poll_handshake))
        .route(
            "/poll/{channel_id}",
            get(handlers::polling::poll)
                .post(handlers::polling::poll_send)
                .delete(handlers::polling::poll_close),
        )
        .layer(DefaultBodyLimit::max(max_body));

    let api_routes = Router::new().route("/api/health", get(handlers::health::health));

    let router = if path.is_empty() {
        api_routes.merge(channel_routes)
    } else {
        api_routes.nest(&path, channel_routes)
    };

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use lovebirds_auth::{JwtDecoder, JwtEncoder};
    use lovebirds_core::config::AppConfig;
    use lovebirds_core::types::UserId;
    use lovebirds_realtime::server::RealtimeEngine;
    use lovebirds_store::MemoryMessageLog;

    use super::*;

    fn state() -> (AppState, JwtEncoder) {
        let config = AppConfig::default();
        let store = Arc::new(MemoryMessageLog::new());
        let engine = RealtimeEngine::new(
            config.realtime.clone(),
            Arc::new(JwtDecoder::new(&config.auth)),
            store.clone(),
            store,
        );
        let encoder = JwtEncoder::new(&config.auth);
        (AppState::new(Arc::new(config), Arc::new(engine)), encoder)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_lists_features() {
        let (state, _) = state();
        let response = build_router(state)
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"], "ok");
        assert!(
            body["data"]["features"]
                .as_array()
                .unwrap()
                .iter()
                .any(|f| f == "Video Calls")
        );
    }

    #[tokio::test]
    async fn test_negotiate_prefers_streaming() {
        let (state, _) = state();
        let response = build_router(state)
            .oneshot(
                Request::get("/realtime/v1/negotiate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["transports"][0], "websocket");
        assert_eq!(body["transports"][1], "polling");
        assert_eq!(body["reconnect"]["max_attempts"], 5);
    }

    #[tokio::test]
    async fn test_malformed_poll_handshake_is_unauthorized() {
        let (state, _) = state();
        let response = build_router(state)
            .oneshot(
                Request::post("/realtime/v1/poll")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"token":"not-a-jwt"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "MALFORMED_CREDENTIAL");
    }

    #[tokio::test]
    async fn test_poll_handshake_admits_valid_token() {
        let (state, encoder) = state();
        let token = encoder.issue(UserId::new(), "Ana").unwrap();
        let registry = state.realtime.registry.clone();

        let response = build_router(state)
            .oneshot(
                Request::post("/realtime/v1/poll")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::json!({ "token": token }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["data"]["channelId"].is_string());
        assert_eq!(registry.channel_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_poll_channel_is_not_found() {
        let (state, _) = state();
        let response = build_router(state)
            .oneshot(
                Request::get(format!("/realtime/v1/poll/{}", uuid_nil()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn uuid_nil() -> &'static str {
        "00000000-0000-0000-0000-000000000000"
    }
}
