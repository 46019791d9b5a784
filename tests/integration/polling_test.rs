//! Integration tests for the long-polling fallback transport.

mod helpers;

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};

use helpers::TestServer;

/// Polls until an event named `event` arrives; returns its `data`.
async fn poll_for(http: &reqwest::Client, channel_url: &str, event: &str) -> Value {
    let deadline = tokio::time::Instant::now() + helpers::EVENT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        let batch: Vec<Value> = http
            .get(channel_url)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if let Some(found) = batch.into_iter().find(|e| e["event"] == event) {
            return found["data"].clone();
        }
    }
    panic!("Timed out polling for {event}");
}

async fn handshake(http: &reqwest::Client, server: &TestServer, token: &str) -> String {
    let response = http
        .post(format!("{}/poll", server.http_base()))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    let channel_id = body["data"]["channelId"].as_str().unwrap();
    format!("{}/poll/{}", server.http_base(), channel_id)
}

#[tokio::test]
async fn test_malformed_token_rejected() {
    let server = TestServer::start().await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{}/poll", server.http_base()))
        .json(&json!({ "token": "a.b" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "MALFORMED_CREDENTIAL");
    assert_eq!(server.engine.registry.channel_count(), 0);
}

#[tokio::test]
async fn test_handshake_then_snapshot() {
    let server = TestServer::start().await;
    let http = reqwest::Client::new();
    let (ana, token) = server.user("Ana").await;
    let (ben, _) = server.user("Ben").await;
    let conversation = server.store.create_conversation(vec![ana, ben]).await;
    server
        .store
        .insert_message_at(conversation, ben, "hello", chrono::Utc::now())
        .await
        .unwrap();

    let channel_url = handshake(&http, &server, &token).await;

    let connected = poll_for(&http, &channel_url, "connected").await;
    assert_eq!(connected["transport"], "polling");
    assert_eq!(connected["userId"], json!(ana));

    let snapshot = poll_for(&http, &channel_url, "recentChatsLoaded").await;
    assert_eq!(snapshot[0]["conversationId"], json!(conversation));
    assert_eq!(snapshot[0]["lastMessagePreview"], "hello");
}

#[tokio::test]
async fn test_empty_poll_returns_after_wait() {
    let server = TestServer::start().await;
    let http = reqwest::Client::new();
    let (_, token) = server.user("Ana").await;

    let channel_url = handshake(&http, &server, &token).await;
    poll_for(&http, &channel_url, "recentChatsLoaded").await;

    let started = tokio::time::Instant::now();
    let batch: Vec<Value> = http.get(&channel_url).send().await.unwrap().json().await.unwrap();

    assert!(batch.is_empty());
    assert!(started.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn test_posted_batch_processed_in_order() {
    let server = TestServer::start().await;
    let http = reqwest::Client::new();
    let (ana, token) = server.user("Ana").await;
    let (ben, _) = server.user("Ben").await;
    let conversation = server.store.create_conversation(vec![ana, ben]).await;

    let channel_url = handshake(&http, &server, &token).await;
    poll_for(&http, &channel_url, "recentChatsLoaded").await;

    let response = http
        .post(&channel_url)
        .json(&json!([
            { "event": "sendMessage", "data": { "conversationId": conversation, "body": "first", "clientRef": "1" } },
            { "event": "sendMessage", "data": { "conversationId": conversation, "body": "second", "clientRef": "2" } }
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let mut refs = Vec::new();
    while refs.len() < 2 {
        let batch: Vec<Value> = http.get(&channel_url).send().await.unwrap().json().await.unwrap();
        refs.extend(
            batch
                .iter()
                .filter(|e| e["event"] == "messageSent")
                .map(|e| e["data"]["clientRef"].as_str().unwrap().to_string()),
        );
    }
    assert_eq!(refs, vec!["1", "2"]);
}

#[tokio::test]
async fn test_polling_user_receives_streaming_sender_message() {
    let server = TestServer::start().await;
    let http = reqwest::Client::new();
    let (ana, ana_token) = server.user("Ana").await;
    let (ben, ben_token) = server.user("Ben").await;
    let conversation = server.store.create_conversation(vec![ana, ben]).await;

    let ben_url = handshake(&http, &server, &ben_token).await;
    poll_for(&http, &ben_url, "recentChatsLoaded").await;

    let (mut ana_ws, _) = server.ws_session(&ana_token).await;
    ana_ws
        .send(json!({
            "event": "sendMessage",
            "data": { "conversationId": conversation, "body": "over here" }
        }))
        .await;
    ana_ws.expect("messageSent").await;

    let update = poll_for(&http, &ben_url, "newMessageForSidebar").await;
    assert_eq!(update["senderId"], json!(ana));
    assert_eq!(update["preview"], "over here");
}

#[tokio::test]
async fn test_delete_closes_channel() {
    let server = TestServer::start().await;
    let http = reqwest::Client::new();
    let (_, token) = server.user("Ana").await;

    let channel_url = handshake(&http, &server, &token).await;
    assert_eq!(server.engine.registry.channel_count(), 1);

    let response = http.delete(&channel_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(server.engine.registry.channel_count(), 0);

    let response = http.get(&channel_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = http
        .post(&channel_url)
        .json(&json!({ "event": "loadRecentChats" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
