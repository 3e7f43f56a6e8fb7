// End-to-end tests for the WebSocket surface
//
// Each test starts a server on an ephemeral port backed by an in-memory
// directory and talks to it with real WebSocket clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventchat::api::{app_state::AppState, create_router};
use eventchat::config::HubConfig;
use eventchat::error::Result;
use eventchat::models::{Event, EventId, User, UserFeatures, UserId};
use eventchat::observability::AppMetrics;
use eventchat::storage::{Directory, InMemoryDirectory};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    for (id, name) in [(7, "Ola"), (9, "Piotr"), (11, "Ewa")] {
        directory
            .upsert_user(User::new(id, name, "Test", 52.2, 21.0))
            .unwrap();
    }
    directory.upsert_event(Event::new(42, "Chess night", 52.2, 21.0).with_members([7, 9]));
    directory
}

async fn spawn_server() -> SocketAddr {
    spawn_server_with(AppState::development(Arc::new(directory()))).await
}

fn state_with(directory: Arc<dyn Directory>, subscriber_buffer: usize, max_subscriptions: usize) -> AppState {
    AppState::new(
        directory,
        HubConfig {
            subscriber_buffer,
            max_subscriptions_per_connection: max_subscriptions,
        },
        Duration::from_secs(2),
        Arc::new(AppMetrics::default()),
    )
}

async fn spawn_server_with(state: AppState) -> SocketAddr {
    let app = create_router(state, Duration::from_secs(5));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Connect and consume the `connected` greeting
async fn connect(addr: SocketAddr) -> Client {
    let (mut client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    let greeting = next_frame(&mut client).await.unwrap();
    assert_eq!(greeting["type"], "connected");
    client
}

async fn send(client: &mut Client, frame: Value) {
    client.send(Message::Text(frame.to_string())).await.unwrap();
}

async fn subscribe(client: &mut Client, scope: &str) {
    send(client, json!({"type": "subscribe", "scope": scope})).await;
    let ack = next_frame(client).await.unwrap();
    assert_eq!(ack["type"], "subscribed");
}

/// Next text frame as JSON, or `None` if nothing arrives in time
async fn next_frame(client: &mut Client) -> Option<Value> {
    next_frame_within(client, Duration::from_millis(500)).await
}

async fn next_frame_within(client: &mut Client, wait: Duration) -> Option<Value> {
    loop {
        let message = tokio::time::timeout(wait, client.next())
            .await
            .ok()??
            .ok()?;
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).ok();
        }
    }
}

#[tokio::test]
async fn test_member_chat_reaches_event_subscribers() {
    let addr = spawn_server().await;
    let mut listener = connect(addr).await;
    let mut other_event = connect(addr).await;
    let mut sender = connect(addr).await;

    subscribe(&mut listener, "event-chat.42").await;
    subscribe(&mut other_event, "event-chat.43").await;

    send(
        &mut sender,
        json!({"type": "chat", "eventId": 42, "senderId": 7, "content": "hello"}),
    )
    .await;

    let frame = next_frame(&mut listener).await.unwrap();
    assert_eq!(
        frame,
        json!({
            "type": "message",
            "scope": "event-chat.42",
            "data": {"eventId": 42, "senderId": 7, "content": "hello"}
        })
    );
    assert!(next_frame(&mut other_event).await.is_none());
}

#[tokio::test]
async fn test_non_member_chat_is_dropped() {
    let addr = spawn_server().await;
    let mut listener = connect(addr).await;
    let mut sender = connect(addr).await;

    subscribe(&mut listener, "/topic/event-chat.42").await;

    send(
        &mut sender,
        json!({"type": "chat", "eventId": 42, "senderId": 11, "content": "let me in"}),
    )
    .await;
    send(
        &mut sender,
        json!({"type": "chat", "eventId": 42, "senderId": 9, "content": "members only"}),
    )
    .await;

    let frame = next_frame(&mut listener).await.unwrap();
    assert_eq!(frame["data"]["senderId"], 9);
    assert_eq!(frame["data"]["content"], "members only");
    assert!(next_frame(&mut listener).await.is_none());
}

#[tokio::test]
async fn test_chat_from_one_sender_keeps_order() {
    let addr = spawn_server().await;
    let mut listener = connect(addr).await;
    let mut sender = connect(addr).await;

    subscribe(&mut listener, "event-chat.42").await;

    for i in 0..5 {
        send(
            &mut sender,
            json!({"type": "chat", "eventId": 42, "senderId": 7, "content": format!("m{}", i)}),
        )
        .await;
    }

    for i in 0..5 {
        let frame = next_frame(&mut listener).await.unwrap();
        assert_eq!(frame["data"]["content"], format!("m{}", i));
    }
}

#[tokio::test]
async fn test_group_list_is_relayed_unchanged() {
    let addr = spawn_server().await;
    let mut listener = connect(addr).await;
    let mut worker = connect(addr).await;

    subscribe(&mut listener, "groups").await;

    let groups = json!([
        {"groupId": 1, "memberIds": [7, 9], "topTraits": ["chess"], "latitude": 52.2, "longitude": 21.0},
        {"groupId": 2, "users": [11], "topTraits": []}
    ]);
    send(&mut worker, groups.clone()).await;

    let frame = next_frame(&mut listener).await.unwrap();
    assert_eq!(frame["type"], "message");
    assert_eq!(frame["scope"], "groups");
    assert_eq!(frame["data"], groups);
}

#[tokio::test]
async fn test_description_is_relayed() {
    let addr = spawn_server().await;
    let mut listener = connect(addr).await;
    let mut sender = connect(addr).await;

    subscribe(&mut listener, "description").await;

    send(
        &mut sender,
        json!({"type": "description", "userId": 11, "content": "I like hiking"}),
    )
    .await;

    let frame = next_frame(&mut listener).await.unwrap();
    assert_eq!(frame["scope"], "description");
    assert_eq!(frame["data"]["userId"], 11);
}

#[tokio::test]
async fn test_malformed_frame_gets_error_and_connection_survives() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    client
        .send(Message::Text("not json".to_string()))
        .await
        .unwrap();
    let reply = next_frame(&mut client).await.unwrap();
    assert_eq!(reply["type"], "error");

    send(&mut client, json!({"type": "chat", "eventId": 42})).await;
    let reply = next_frame(&mut client).await.unwrap();
    assert_eq!(reply["type"], "error");

    send(&mut client, json!({"type": "ping"})).await;
    let reply = next_frame(&mut client).await.unwrap();
    assert_eq!(reply["type"], "pong");
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let addr = spawn_server().await;
    let mut listener = connect(addr).await;
    let mut sender = connect(addr).await;

    subscribe(&mut listener, "event-chat.42").await;
    send(&mut listener, json!({"type": "unsubscribe", "scope": "event-chat.42"})).await;
    let ack = next_frame(&mut listener).await.unwrap();
    assert_eq!(ack["type"], "unsubscribed");

    send(
        &mut sender,
        json!({"type": "chat", "eventId": 42, "senderId": 7, "content": "anyone?"}),
    )
    .await;

    assert!(next_frame(&mut listener).await.is_none());
}

#[tokio::test]
async fn test_subscription_limit_per_connection() {
    let addr = spawn_server_with(state_with(Arc::new(directory()), 64, 1)).await;
    let mut client = connect(addr).await;

    subscribe(&mut client, "event-chat.42").await;
    // same scope again is not a new subscription
    subscribe(&mut client, "event-chat.42").await;

    send(&mut client, json!({"type": "subscribe", "scope": "groups"})).await;
    let reply = next_frame(&mut client).await.unwrap();
    assert_eq!(reply["type"], "error");
    assert!(
        reply["message"]
            .as_str()
            .unwrap()
            .contains("subscription limit")
    );
}

#[tokio::test]
async fn test_slow_subscriber_is_evicted_and_closed() {
    let addr = spawn_server_with(state_with(Arc::new(directory()), 1, 32)).await;
    let mut stalled = connect(addr).await;
    let mut worker = connect(addr).await;

    subscribe(&mut stalled, "groups").await;

    // Large frames fill the socket buffers so the stalled connection
    // cannot drain its queue.
    let members: Vec<u64> = (100_000..112_000).collect();
    let groups = json!([{"groupId": 1, "memberIds": members, "topTraits": []}]);
    for _ in 0..600 {
        send(&mut worker, groups.clone()).await;
    }
    send(&mut worker, json!({"type": "ping"})).await;
    let pong = next_frame_within(&mut worker, Duration::from_secs(30)).await.unwrap();
    assert_eq!(pong["type"], "pong");

    let mut delivered = 0;
    loop {
        let message = tokio::time::timeout(Duration::from_secs(10), stalled.next())
            .await
            .expect("stalled client got no eviction notice")
            .expect("connection ended without a close frame")
            .unwrap();
        match message {
            Message::Text(text) => {
                let frame: Value = serde_json::from_str(&text).unwrap();
                if frame["type"] == "evicted" {
                    assert_eq!(frame["scope"], "groups");
                    break;
                }
                assert_eq!(frame["type"], "message");
                delivered += 1;
            }
            _ => continue,
        }
    }
    assert!(delivered < 600);

    let close = tokio::time::timeout(Duration::from_secs(5), stalled.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match close {
        Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Again),
        other => panic!("expected close frame, got {:?}", other),
    }
}

/// Directory that answers membership after a fixed delay
struct SlowDirectory {
    delay: Duration,
    inner: InMemoryDirectory,
}

#[async_trait]
impl Directory for SlowDirectory {
    async fn is_member(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.is_member(event_id, user_id).await
    }

    async fn all_users_with_traits_and_location(&self) -> Result<Vec<UserFeatures>> {
        self.inner.all_users_with_traits_and_location().await
    }

    fn backend_name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test]
async fn test_chat_is_discarded_when_sender_closes_during_authorization() {
    let directory = SlowDirectory {
        delay: Duration::from_millis(300),
        inner: directory(),
    };
    let addr = spawn_server_with(state_with(Arc::new(directory), 64, 32)).await;
    let mut listener = connect(addr).await;
    subscribe(&mut listener, "event-chat.42").await;

    // a sender that stays connected is delivered once the check completes
    let mut steady = connect(addr).await;
    send(
        &mut steady,
        json!({"type": "chat", "eventId": 42, "senderId": 7, "content": "still here"}),
    )
    .await;
    let frame = next_frame_within(&mut listener, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(frame["data"]["content"], "still here");

    let mut leaving = connect(addr).await;
    send(
        &mut leaving,
        json!({"type": "chat", "eventId": 42, "senderId": 9, "content": "bye"}),
    )
    .await;
    leaving.close(None).await.unwrap();

    assert!(
        next_frame_within(&mut listener, Duration::from_secs(1))
            .await
            .is_none()
    );
}
