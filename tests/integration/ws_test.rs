//! Integration tests for the streaming (WebSocket) transport.

mod helpers;

use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;

use helpers::TestServer;

#[tokio::test]
async fn test_malformed_token_rejected_without_session() {
    let server = TestServer::start().await;

    let mut client = server.ws_connect("not-a-jwt").await;
    let error = client.expect("connectError").await;

    assert_eq!(error["code"], "MALFORMED_CREDENTIAL");
    assert!(error["reason"].as_str().unwrap().starts_with("Authentication failed"));
    assert!(client.closed_within(Duration::from_secs(2)).await);
    assert_eq!(server.engine.registry.channel_count(), 0);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let server = TestServer::start().await;
    let (user_id, _) = server.user("Ana").await;
    let token = server.expired_token(user_id, "Ana");

    let mut client = server.ws_connect(&token).await;
    let error = client.expect("connectError").await;

    assert_eq!(error["code"], "AUTHENTICATION");
    assert!(client.closed_within(Duration::from_secs(2)).await);
    assert_eq!(server.engine.metrics_snapshot().handshakes_rejected, 1);
}

#[tokio::test]
async fn test_first_frame_must_be_auth() {
    let server = TestServer::start().await;

    let (stream, _) = tokio_tungstenite::connect_async(server.ws_url()).await.unwrap();
    let mut client = helpers::WsClient::from_stream(stream);
    client.send(json!({ "event": "loadRecentChats" })).await;

    let error = client.expect("connectError").await;
    assert_eq!(error["code"], "VALIDATION");
    assert!(client.closed_within(Duration::from_secs(2)).await);
    assert_eq!(server.engine.registry.channel_count(), 0);
}

#[tokio::test]
async fn test_initial_snapshot_most_recent_first() {
    let server = TestServer::start().await;
    let (ana, token) = server.user("Ana").await;
    let (ben, _) = server.user("Ben").await;
    let (cleo, _) = server.user("Cleo").await;

    let older = server.store.create_conversation(vec![ana, ben]).await;
    let newer = server.store.create_conversation(vec![ana, cleo]).await;
    server
        .store
        .insert_message_at(older, ben, "hi", Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap())
        .await
        .unwrap();
    server
        .store
        .insert_message_at(newer, cleo, "hey", Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap())
        .await
        .unwrap();

    let (mut client, _) = server.ws_session(&token).await;
    let snapshot = client.expect("recentChatsLoaded").await;

    let ids: Vec<String> = snapshot
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["conversationId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![newer.to_string(), older.to_string()]);
    assert_eq!(snapshot[0]["otherParticipant"]["name"], "Cleo");
    assert_eq!(snapshot[0]["unreadCount"], 1);
}

#[tokio::test]
async fn test_explicit_load_is_answered_once() {
    let server = TestServer::start().await;
    let (_, token) = server.user("Ana").await;

    let (mut client, _) = server.ws_session(&token).await;
    client.send(json!({ "event": "loadRecentChats" })).await;

    let snapshots = client
        .collect("recentChatsLoaded", Duration::from_millis(500))
        .await;
    assert_eq!(snapshots, vec![json!([])]);
}

#[tokio::test]
async fn test_sent_message_reaches_sidebar_exactly_once() {
    let server = TestServer::start().await;
    let (ana, ana_token) = server.user("Ana").await;
    let (ben, ben_token) = server.user("Ben").await;
    let conversation = server.store.create_conversation(vec![ana, ben]).await;

    let (mut ana_ws, _) = server.ws_session(&ana_token).await;
    let (mut ben_ws, _) = server.ws_session(&ben_token).await;
    ben_ws.expect("recentChatsLoaded").await;

    ana_ws
        .send(json!({
            "event": "sendMessage",
            "data": { "conversationId": conversation, "body": "see you at eight", "clientRef": "m-1" }
        }))
        .await;

    let ack = ana_ws.expect("messageSent").await;
    assert_eq!(ack["clientRef"], "m-1");

    let updates = ben_ws
        .collect("newMessageForSidebar", Duration::from_millis(500))
        .await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["conversationId"], json!(conversation));
    assert_eq!(updates[0]["senderName"], "Ana");
    assert_eq!(updates[0]["preview"], "see you at eight");
    assert_eq!(updates[0]["messageId"], ack["messageId"]);
}

#[tokio::test]
async fn test_typing_forwarded_to_partner() {
    let server = TestServer::start().await;
    let (ana, ana_token) = server.user("Ana").await;
    let (ben, ben_token) = server.user("Ben").await;
    let conversation = server.store.create_conversation(vec![ana, ben]).await;

    let (mut ana_ws, _) = server.ws_session(&ana_token).await;
    let (mut ben_ws, _) = server.ws_session(&ben_token).await;

    ana_ws
        .send(json!({
            "event": "signalTyping",
            "data": { "conversationId": conversation, "active": true }
        }))
        .await;
    let started = ben_ws.expect("userTyping").await;
    assert_eq!(started["typingUserId"], json!(ana));
    assert_eq!(started["active"], true);

    ana_ws
        .send(json!({
            "event": "signalTyping",
            "data": { "conversationId": conversation, "active": false }
        }))
        .await;
    let stopped = ben_ws.expect("userTyping").await;
    assert_eq!(stopped["active"], false);
}

#[tokio::test]
async fn test_disconnect_while_typing_sends_stop() {
    let server = TestServer::start().await;
    let (ana, ana_token) = server.user("Ana").await;
    let (ben, ben_token) = server.user("Ben").await;
    let conversation = server.store.create_conversation(vec![ana, ben]).await;

    let (mut ana_ws, _) = server.ws_session(&ana_token).await;
    let (mut ben_ws, _) = server.ws_session(&ben_token).await;

    ana_ws
        .send(json!({
            "event": "signalTyping",
            "data": { "conversationId": conversation, "active": true }
        }))
        .await;
    assert_eq!(ben_ws.expect("userTyping").await["active"], true);

    ana_ws.close().await;

    assert_eq!(ben_ws.expect("userTyping").await["active"], false);
    let presence = ben_ws.expect("presenceChanged").await;
    assert_eq!(presence["userId"], json!(ana));
    assert_eq!(presence["online"], false);
}

#[tokio::test]
async fn test_bad_frame_does_not_close_channel() {
    let server = TestServer::start().await;
    let (_, token) = server.user("Ana").await;

    let (mut client, _) = server.ws_session(&token).await;
    client.expect("recentChatsLoaded").await;

    client.send_raw("{ this is not json").await;
    let error = client.expect("error").await;
    assert_eq!(error["code"], "VALIDATION");

    client.send(json!({ "event": "loadRecentChats" })).await;
    client.expect("recentChatsLoaded").await;
    assert_eq!(server.engine.registry.channel_count(), 1);
}
