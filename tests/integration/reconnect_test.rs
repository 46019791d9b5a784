//! Integration tests for the client reconnection controller against a
//! live server.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use lovebirds_client::transport::{FallbackConnector, PollingConnector, WsConnector};
use lovebirds_client::{ChatClient, ConnectionState, ReconnectPolicy};
use lovebirds_core::config::TransportKind;
use lovebirds_core::types::ChannelId;
use lovebirds_realtime::message::types::OutboundMessage;

use helpers::{EVENT_TIMEOUT, TestServer};

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy::default()
        .with_base_delay(Duration::from_millis(50))
        .with_max_delay(Duration::from_millis(200))
}

async fn connected_channel(client: &ChatClient) -> (ChannelId, TransportKind) {
    let state = tokio::time::timeout(
        EVENT_TIMEOUT,
        client.wait_for_state(|s| matches!(s, ConnectionState::Connected { .. })),
    )
    .await
    .expect("Timed out waiting for connection")
    .unwrap();
    match state {
        ConnectionState::Connected {
            channel_id,
            transport,
        } => (channel_id, transport),
        other => panic!("Unexpected state {other:?}"),
    }
}

async fn next_snapshot(client: &mut ChatClient) -> OutboundMessage {
    loop {
        let event = tokio::time::timeout(EVENT_TIMEOUT, client.next_event())
            .await
            .expect("Timed out waiting for snapshot")
            .expect("Client closed");
        if matches!(event, OutboundMessage::RecentChatsLoaded(_)) {
            return event;
        }
    }
}

#[tokio::test]
async fn test_reconnect_opens_new_session_and_resyncs() {
    let server = TestServer::start().await;
    let (user_id, token) = server.user("Ana").await;
    let connector = Arc::new(WsConnector::new(server.ws_url()));

    let mut client = ChatClient::start(connector, fast_policy(), token).unwrap();
    let (first, transport) = connected_channel(&client).await;
    assert_eq!(transport, TransportKind::Websocket);
    next_snapshot(&mut client).await;

    assert!(server.engine.connections.close(&first, "test drop").await);

    let second = loop {
        let (id, _) = connected_channel(&client).await;
        if id != first {
            break id;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    next_snapshot(&mut client).await;

    assert_eq!(server.engine.registry.channels_for(&user_id), vec![second]);
    assert_eq!(client.close().await, ConnectionState::Closed);
}

#[tokio::test]
async fn test_expired_credential_logs_out() {
    let server = TestServer::start().await;
    let (user_id, _) = server.user("Ana").await;
    let token = server.expired_token(user_id, "Ana");
    let connector = Arc::new(WsConnector::new(server.ws_url()));

    let client = ChatClient::start(connector, fast_policy(), token).unwrap();
    let end = tokio::time::timeout(EVENT_TIMEOUT, client.wait_for_state(|s| s.is_terminal()))
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(end, ConnectionState::LoggedOut { .. }));
    assert_eq!(server.engine.registry.channel_count(), 0);
}

#[tokio::test]
async fn test_forced_logout_is_not_retried() {
    let server = TestServer::start().await;
    let (user_id, token) = server.user("Ana").await;
    let connector = Arc::new(WsConnector::new(server.ws_url()));

    let client = ChatClient::start(connector, fast_policy(), token).unwrap();
    connected_channel(&client).await;

    assert_eq!(
        server.engine.connections.force_logout(&user_id, "password changed").await,
        1
    );

    let end = tokio::time::timeout(EVENT_TIMEOUT, client.wait_for_state(|s| s.is_terminal()))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(end, ConnectionState::LoggedOut { .. }));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.engine.registry.channel_count(), 0);
}

#[tokio::test]
async fn test_falls_back_to_polling() {
    let server = TestServer::start().await;
    let (_, token) = server.user("Ana").await;
    let broken = format!("ws://{}/no-such-endpoint", server.addr);
    let connector = Arc::new(FallbackConnector::new(
        Box::new(WsConnector::new(broken)),
        Box::new(PollingConnector::new(server.http_base())),
    ));

    let mut client = ChatClient::start(connector, fast_policy(), token).unwrap();
    let (_, transport) = connected_channel(&client).await;

    assert_eq!(transport, TransportKind::Polling);
    next_snapshot(&mut client).await;
    assert_eq!(client.close().await, ConnectionState::Closed);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let server = TestServer::start().await;
    let (_, token) = server.user("Ana").await;
    // Nothing listens on the discard port.
    let connector = Arc::new(WsConnector::new("ws://127.0.0.1:9/realtime/v1/ws"));

    let client = ChatClient::start(connector, fast_policy().with_max_attempts(2), token).unwrap();
    let end = tokio::time::timeout(EVENT_TIMEOUT, client.wait_for_state(|s| s.is_terminal()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(end, ConnectionState::Failed { attempts: 2 });
}
