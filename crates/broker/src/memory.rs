//! In-memory broker
//!
//! Process-local pub/sub and queues with failure injection, used by unit and
//! end-to-end tests and for running the bridge without a Redis server.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use contracts::{ContractError, InboundMessage, QueueWriter, Subscription};
use tokio::sync::mpsc;
use tracing::{debug, instrument, trace};

use crate::client::Broker;
use crate::error::{BrokerError, Result};

/// Memory broker configuration
#[derive(Debug, Default, Clone)]
pub struct MemoryConfig {
    /// Queues whose appends always fail
    pub fail_queues: Vec<String>,
    /// Make `connect` fail (simulates an unreachable store)
    pub fail_connect: bool,
    /// Delay applied to every append
    pub append_delay: Option<Duration>,
}

/// One recorded append attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRecord {
    pub queue: String,
    pub payload: Bytes,
    pub success: bool,
}

struct SubscriberEntry {
    channels: HashSet<String>,
    tx: mpsc::UnboundedSender<InboundMessage>,
}

#[derive(Default)]
struct MemoryState {
    subscribers: Mutex<Vec<SubscriberEntry>>,
    queues: Mutex<HashMap<String, VecDeque<Bytes>>>,
    appends: Mutex<Vec<AppendRecord>>,
    failing: Mutex<HashSet<String>>,
    appends_in_flight: AtomicUsize,
    subscription_closes: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory broker
///
/// Cheap to clone; clones share the same channels and queues.
#[derive(Clone)]
pub struct MemoryBroker {
    config: MemoryConfig,
    state: Arc<MemoryState>,
    connected: Arc<AtomicBool>,
}

impl MemoryBroker {
    /// Create default memory broker
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    /// Create memory broker with configuration
    pub fn with_config(config: MemoryConfig) -> Self {
        let state = MemoryState::default();
        lock(&state.failing).extend(config.fail_queues.iter().cloned());
        Self {
            config,
            state: Arc::new(state),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Publish to a channel
    ///
    /// Returns the number of subscriptions that received the message. Like
    /// Redis PUBLISH, a message with no listener is simply lost.
    pub fn publish(&self, channel: &str, payload: impl Into<Bytes>) -> usize {
        let message = InboundMessage::new(channel, payload);
        let mut subscribers = lock(&self.state.subscribers);
        subscribers.retain(|entry| !entry.tx.is_closed());

        let mut delivered = 0;
        for entry in subscribers.iter() {
            if entry.channels.contains(channel) && entry.tx.send(message.clone()).is_ok() {
                delivered += 1;
            }
        }
        trace!(channel, delivered, "published");
        delivered
    }

    /// Deliver a message to every live subscription, whatever channels it
    /// subscribed to
    ///
    /// Stands in for a server that pushes a message on a channel the client
    /// never asked for.
    pub fn inject(&self, channel: &str, payload: impl Into<Bytes>) -> usize {
        let message = InboundMessage::new(channel, payload);
        let mut subscribers = lock(&self.state.subscribers);
        subscribers.retain(|entry| !entry.tx.is_closed());

        let delivered = subscribers
            .iter()
            .filter(|entry| entry.tx.send(message.clone()).is_ok())
            .count();
        trace!(channel, delivered, "injected");
        delivered
    }

    /// Drop every live subscription's feed, ending their message sequences
    pub fn disconnect_subscribers(&self) {
        lock(&self.state.subscribers).clear();
    }

    /// Start or stop failing appends to `queue`
    pub fn set_queue_failing(&self, queue: &str, failing: bool) {
        let mut set = lock(&self.state.failing);
        if failing {
            set.insert(queue.to_string());
        } else {
            set.remove(queue);
        }
    }

    /// Current queue contents, head first
    pub fn queue_contents(&self, queue: &str) -> Vec<Bytes> {
        lock(&self.state.queues)
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Pop from the head of a queue (consumer side)
    pub fn pop(&self, queue: &str) -> Option<Bytes> {
        lock(&self.state.queues).get_mut(queue)?.pop_front()
    }

    /// Every append attempt, in the order they started
    pub fn append_log(&self) -> Vec<AppendRecord> {
        lock(&self.state.appends).clone()
    }

    /// Number of appends started but not yet finished
    pub fn appends_in_flight(&self) -> usize {
        self.state.appends_in_flight.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = lock(&self.state.subscribers);
        subscribers.retain(|entry| !entry.tx.is_closed());
        subscribers.len()
    }

    /// How many subscriptions have been closed (each counted once)
    pub fn subscription_closes(&self) -> usize {
        self.state.subscription_closes.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::NotConnected)
        }
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker for MemoryBroker {
    type Subscription = MemorySubscription;
    type Writer = MemoryQueueWriter;

    #[instrument(name = "memory_broker_connect", skip(self))]
    async fn connect(&mut self) -> Result<()> {
        if self.config.fail_connect {
            return Err(BrokerError::connection("memory", "injected connect failure"));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    #[instrument(name = "memory_broker_subscribe", skip(self), fields(channels = channels.len()))]
    async fn subscribe(&self, channels: &[String]) -> Result<MemorySubscription> {
        self.ensure_connected()?;
        if channels.is_empty() {
            return Err(BrokerError::NoChannels);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.state.subscribers).push(SubscriberEntry {
            channels: channels.iter().cloned().collect(),
            tx,
        });
        debug!(?channels, "memory subscription opened");

        Ok(MemorySubscription {
            channels: channels.to_vec(),
            rx,
            closed: false,
            state: Arc::clone(&self.state),
        })
    }

    fn queue_writer(&self) -> Result<MemoryQueueWriter> {
        self.ensure_connected()?;
        Ok(MemoryQueueWriter {
            state: Arc::clone(&self.state),
            append_delay: self.config.append_delay,
        })
    }
}

/// Subscription fed by [`MemoryBroker::publish`]
pub struct MemorySubscription {
    channels: Vec<String>,
    rx: mpsc::UnboundedReceiver<InboundMessage>,
    closed: bool,
    state: Arc<MemoryState>,
}

impl Subscription for MemorySubscription {
    fn channels(&self) -> &[String] {
        &self.channels
    }

    async fn next_message(&mut self) -> Option<InboundMessage> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    async fn close(&mut self) -> std::result::Result<(), ContractError> {
        if !self.closed {
            self.closed = true;
            self.rx.close();
            self.state.subscription_closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Writer appending to [`MemoryBroker`] queues
pub struct MemoryQueueWriter {
    state: Arc<MemoryState>,
    append_delay: Option<Duration>,
}

impl QueueWriter for MemoryQueueWriter {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&mut self, queue: &str, payload: &Bytes) -> std::result::Result<(), ContractError> {
        self.state.appends_in_flight.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.append_delay {
            tokio::time::sleep(delay).await;
        }

        let success = !lock(&self.state.failing).contains(queue);
        if success {
            lock(&self.state.queues)
                .entry(queue.to_string())
                .or_default()
                .push_back(payload.clone());
        }
        lock(&self.state.appends).push(AppendRecord {
            queue: queue.to_string(),
            payload: payload.clone(),
            success,
        });
        self.state.appends_in_flight.fetch_sub(1, Ordering::SeqCst);

        if success {
            Ok(())
        } else {
            Err(ContractError::queue_write(queue, "injected append failure"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected(config: MemoryConfig) -> MemoryBroker {
        let mut broker = MemoryBroker::with_config(config);
        broker.connect().await.unwrap();
        broker
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_subscription() {
        let broker = connected(MemoryConfig::default()).await;
        let mut sub = broker.subscribe(&["orders".to_string()]).await.unwrap();

        assert_eq!(broker.publish("orders", "order-42"), 1);
        assert_eq!(broker.publish("other", "ignored"), 0);

        let msg = sub.next_message().await.unwrap();
        assert_eq!(msg.channel, "orders");
        assert_eq!(msg.payload, Bytes::from("order-42"));
    }

    #[tokio::test]
    async fn test_inject_ignores_channel_set() {
        let broker = connected(MemoryConfig::default()).await;
        let mut sub = broker.subscribe(&["orders".to_string()]).await.unwrap();

        assert_eq!(broker.inject("debug", "noise"), 1);

        let msg = sub.next_message().await.unwrap();
        assert_eq!(msg.channel, "debug");
        assert_eq!(msg.payload, Bytes::from("noise"));
    }

    #[tokio::test]
    async fn test_subscribe_requires_channels() {
        let broker = connected(MemoryConfig::default()).await;
        let result = broker.subscribe(&[]).await;
        assert!(matches!(result, Err(BrokerError::NoChannels)));
    }

    #[tokio::test]
    async fn test_subscribe_requires_connect() {
        let broker = MemoryBroker::new();
        let result = broker.subscribe(&["a".to_string()]).await;
        assert!(matches!(result, Err(BrokerError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_failure_injection() {
        let mut broker = MemoryBroker::with_config(MemoryConfig {
            fail_connect: true,
            ..Default::default()
        });
        assert!(broker.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_ends_sequence() {
        let broker = connected(MemoryConfig::default()).await;
        let mut sub = broker.subscribe(&["a".to_string()]).await.unwrap();
        broker.publish("a", "queued");

        sub.close().await.unwrap();
        sub.close().await.unwrap();

        assert!(sub.next_message().await.is_none());
        assert_eq!(broker.subscription_closes(), 1);
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_append_and_failure_injection() {
        let broker = connected(MemoryConfig {
            fail_queues: vec!["bad".to_string()],
            ..Default::default()
        })
        .await;
        let mut writer = broker.queue_writer().unwrap();
        let payload = Bytes::from("p");

        assert!(writer.append("good", &payload).await.is_ok());
        assert!(writer.append("bad", &payload).await.is_err());

        assert_eq!(broker.queue_contents("good"), vec![payload.clone()]);
        assert!(broker.queue_contents("bad").is_empty());

        let log = broker.append_log();
        assert_eq!(log.len(), 2);
        assert!(log[0].success);
        assert!(!log[1].success);

        broker.set_queue_failing("bad", false);
        assert!(writer.append("bad", &payload).await.is_ok());
        assert_eq!(broker.pop("bad"), Some(payload));
    }

    #[tokio::test]
    async fn test_disconnect_ends_subscription() {
        let broker = connected(MemoryConfig::default()).await;
        let mut sub = broker.subscribe(&["a".to_string()]).await.unwrap();
        broker.disconnect_subscribers();
        assert!(sub.next_message().await.is_none());
    }
}
