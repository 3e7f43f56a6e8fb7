//! WebSocket Handler Module
//!
//! Provides real-time event chat and group broadcasts over WebSocket.
//! Each connection can subscribe to any number of scopes (`event-chat.<id>`,
//! `groups`, `description`) and submit chat messages, grouping results and
//! description messages.

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures_util::stream::{self, BoxStream, SplitSink};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_stream::StreamMap;
use tracing::{debug, error, info, warn};

use crate::api::app_state::AppState;
use crate::models::ChatMessage;
use crate::services::EventChatService;

pub mod envelope;
pub mod hub;
pub mod scope;

use envelope::{Broadcast, InboundFrame, OutboundFrame};
use hub::Subscription;
use scope::Scope;

/// Subscription stream of one scope; yields `None` once when the hub has
/// evicted the subscriber.
type ScopeStream = BoxStream<'static, Option<Arc<Broadcast>>>;

type WsSender = SplitSink<WebSocket, Message>;

/// WebSocket handler using Axum's WebSocket support
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the WebSocket connection
async fn handle_socket(ws: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = ws.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    info!(connection_id, "New WebSocket connection");
    state.metrics.record_connection(1);

    let init_event = OutboundFrame::Connected {
        id: &connection_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    if let Err(e) = send_frame(&mut sender, &init_event).await {
        error!(connection_id, "Failed to send init event: {}", e);
        state.metrics.record_connection(-1);
        return;
    }

    // Chat messages wait on a directory lookup, so they run on a
    // per-connection worker in arrival order while this loop keeps
    // draining subscriptions.
    let closed = Arc::new(AtomicBool::new(false));
    let (chat_inbox, chat_queue) = mpsc::channel(state.hub_config.subscriber_buffer.max(1));
    tokio::spawn(run_chat_worker(
        Arc::clone(&state.chat_service),
        chat_queue,
        Arc::clone(&closed),
        connection_id.clone(),
    ));

    let mut subscriptions: StreamMap<Scope, ScopeStream> = StreamMap::new();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection_id, "Client initiated close");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(connection_id, "WebSocket error: {}", e);
                        break;
                    }
                };

                if let Some(reply) =
                    process_message(&text, &state, &mut subscriptions, &chat_inbox, &connection_id)
                {
                    if let Err(e) = sender.send(Message::Text(reply)).await {
                        error!(connection_id, "Failed to send reply: {}", e);
                        break;
                    }
                }
            }
            Some((scope, delivery)) = subscriptions.next(), if !subscriptions.is_empty() => {
                match delivery {
                    Some(payload) => {
                        let frame = OutboundFrame::Message { scope, data: payload.as_ref() };
                        if let Err(e) = send_frame(&mut sender, &frame).await {
                            error!(connection_id, scope = %scope, "Failed to forward message: {}", e);
                            break;
                        }
                    }
                    None => {
                        warn!(connection_id, scope = %scope, "Subscriber evicted, closing connection");
                        let _ = send_frame(&mut sender, &OutboundFrame::Evicted { scope }).await;
                        let _ = sender
                            .send(Message::Close(Some(CloseFrame {
                                code: close_code::AGAIN,
                                reason: "subscriber queue overflow".into(),
                            })))
                            .await;
                        break;
                    }
                }
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    drop(subscriptions);
    state.metrics.record_connection(-1);
    debug!(connection_id, "WebSocket connection closed");
}

/// Process one inbound text frame, returning an optional reply
fn process_message(
    text: &str,
    state: &AppState,
    subscriptions: &mut StreamMap<Scope, ScopeStream>,
    chat_inbox: &mpsc::Sender<ChatMessage>,
    connection_id: &str,
) -> Option<String> {
    let frame = match InboundFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(connection_id, "Rejected frame: {}", e);
            state.metrics.record_malformed_frame();
            return Some(
                OutboundFrame::Error {
                    message: e.to_string(),
                }
                .to_json(),
            );
        }
    };

    match frame {
        InboundFrame::Chat(message) => {
            if chat_inbox.try_send(message).is_err() {
                warn!(connection_id, "Chat inbox full, dropping message");
            }
            None
        }
        InboundFrame::Groups { groups } => {
            state.group_relay.relay(groups);
            None
        }
        InboundFrame::Description(message) => {
            state.group_relay.relay_description(message);
            None
        }
        InboundFrame::Subscribe { scope } => {
            if !subscriptions.contains_key(&scope) {
                if subscriptions.len() >= state.hub_config.max_subscriptions_per_connection {
                    return Some(
                        OutboundFrame::Error {
                            message: format!(
                                "subscription limit of {} reached",
                                state.hub_config.max_subscriptions_per_connection
                            ),
                        }
                        .to_json(),
                    );
                }
                subscriptions.insert(scope, scope_stream(state.hub.subscribe(scope)));
                debug!(connection_id, scope = %scope, "Subscribed");
            }
            Some(OutboundFrame::Subscribed { scope }.to_json())
        }
        InboundFrame::Unsubscribe { scope } => {
            subscriptions.remove(&scope);
            debug!(connection_id, scope = %scope, "Unsubscribed");
            Some(OutboundFrame::Unsubscribed { scope }.to_json())
        }
        InboundFrame::Ping => Some(
            OutboundFrame::Pong {
                timestamp: chrono::Utc::now().to_rfc3339(),
            }
            .to_json(),
        ),
    }
}

/// Authorize and publish chat messages of one connection in arrival order.
/// A check still in flight when the connection closes completes, but its
/// message is discarded.
async fn run_chat_worker(
    chat: Arc<EventChatService>,
    mut queue: mpsc::Receiver<ChatMessage>,
    closed: Arc<AtomicBool>,
    connection_id: String,
) {
    while let Some(message) = queue.recv().await {
        let authorization = chat.authorize(&message).await;
        if closed.load(Ordering::SeqCst) {
            debug!(connection_id, "Connection closed during authorization, discarding");
            break;
        }
        chat.deliver(message, authorization);
    }
}

fn scope_stream(subscription: Subscription) -> ScopeStream {
    subscription
        .map(Some)
        .chain(stream::once(async { None }))
        .boxed()
}

async fn send_frame(sender: &mut WsSender, frame: &OutboundFrame<'_>) -> Result<(), axum::Error> {
    sender.send(Message::Text(frame.to_json())).await
}
