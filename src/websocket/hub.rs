//! Broadcast Hub
//!
//! Routes payloads from a scope to every subscriber of that scope.
//!
//! Each scope owns its subscriber list behind its own lock, so traffic on one
//! event never contends with another. Every subscriber gets a bounded queue.
//! Publishing never waits on a subscriber. A subscriber whose queue is full is
//! evicted, and its stream ends once the already queued payloads are drained.
//! There is no backlog. A subscriber only sees payloads published after it
//! joined.

use dashmap::DashMap;
use futures_util::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::envelope::Broadcast;
use super::scope::Scope;

/// Default queue length per subscriber
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    sender: mpsc::Sender<Arc<Broadcast>>,
}

/// Subscriber list of one scope. Registration and publish-time iteration
/// both go through this lock, which also serializes delivery per scope.
#[derive(Default)]
struct ScopeChannel {
    subscribers: Vec<Subscriber>,
}

type ScopeTable = DashMap<Scope, Arc<Mutex<ScopeChannel>>>;

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers the payload was queued for
    pub delivered: usize,
    /// Subscribers dropped because their queue was full
    pub evicted: usize,
}

/// Injectable pub/sub hub keyed by [`Scope`]
pub struct BroadcastHub {
    scopes: Arc<ScopeTable>,
    next_id: AtomicU64,
    buffer: usize,
}

impl BroadcastHub {
    /// Create a hub with the default per-subscriber buffer
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    /// Create a hub with the given per-subscriber buffer (at least 1)
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            scopes: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Register a new subscriber on `scope`
    pub fn subscribe(&self, scope: Scope) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.buffer);

        // The shard guard stays held while pushing so that a concurrent
        // cleanup cannot drop this channel between lookup and insert.
        let entry = self.scopes.entry(scope).or_default();
        entry.lock().subscribers.push(Subscriber { id, sender });
        let channel = Arc::clone(entry.value());
        drop(entry);

        debug!(scope = %scope, subscriber = id, "Subscriber registered");

        Subscription {
            id,
            scope,
            receiver,
            channel,
            scopes: Arc::clone(&self.scopes),
        }
    }

    /// Deliver `payload` to every current subscriber of `scope`
    pub fn publish(&self, scope: &Scope, payload: Broadcast) -> PublishReport {
        let Some(channel) = self.scopes.get(scope).map(|c| Arc::clone(c.value())) else {
            debug!(scope = %scope, "Publish with no subscribers");
            return PublishReport::default();
        };

        let payload = Arc::new(payload);
        let mut report = PublishReport::default();

        let mut channel = channel.lock();
        channel
            .subscribers
            .retain(|subscriber| match subscriber.sender.try_send(Arc::clone(&payload)) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        scope = %scope,
                        subscriber = subscriber.id,
                        "Subscriber queue full, evicting"
                    );
                    report.evicted += 1;
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            });

        report
    }

    /// Number of live subscribers on `scope`
    pub fn subscriber_count(&self, scope: &Scope) -> usize {
        self.scopes
            .get(scope)
            .map(|c| Arc::clone(c.value()))
            .map_or(0, |channel| channel.lock().subscribers.len())
    }

    /// Number of scopes that currently have a subscriber list
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("scopes", &self.scopes.len())
            .field("buffer", &self.buffer)
            .finish()
    }
}

/// Live subscription to one scope
///
/// Yields payloads in publish order. Dropping it unregisters the subscriber.
pub struct Subscription {
    id: SubscriberId,
    scope: Scope,
    receiver: mpsc::Receiver<Arc<Broadcast>>,
    channel: Arc<Mutex<ScopeChannel>>,
    scopes: Arc<ScopeTable>,
}

impl Subscription {
    /// Scope this subscription listens on
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Wait for the next payload; `None` once the subscriber was evicted
    pub async fn recv(&mut self) -> Option<Arc<Broadcast>> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = Arc<Broadcast>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let id = self.id;
        self.channel.lock().subscribers.retain(|s| s.id != id);
        self.scopes
            .remove_if(&self.scope, |_, channel| channel.lock().subscribers.is_empty());
        debug!(scope = %self.scope, subscriber = id, "Subscriber removed");
    }
}
