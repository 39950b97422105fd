//! Redis broker
//!
//! Pub/sub through a dedicated SUBSCRIBE connection; queue appends through a
//! shared `ConnectionManager` using RPUSH.

use std::pin::Pin;

use bytes::Bytes;
use contracts::{ContractError, InboundMessage, QueueWriter, RedisConfig, Subscription};
use futures::{Stream, StreamExt};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ConnectionAddr, ConnectionInfo, Msg, RedisConnectionInfo};
use tracing::{debug, instrument};

use crate::client::Broker;
use crate::error::{BrokerError, Result};

type MessageStream = Pin<Box<dyn Stream<Item = Msg> + Send>>;

/// Redis-backed broker
pub struct RedisBroker {
    config: RedisConfig,
    client: Option<Client>,
    manager: Option<ConnectionManager>,
}

impl RedisBroker {
    /// Create an unconnected broker
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config,
            client: None,
            manager: None,
        }
    }

    /// Server address (`host:port`)
    pub fn address(&self) -> String {
        self.config.address()
    }

    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.config.host.clone(), self.config.port),
            redis: RedisConnectionInfo {
                db: self.config.db,
                password: self.config.password().map(str::to_string),
                ..Default::default()
            },
        }
    }

    fn connection_error(&self, err: redis::RedisError) -> BrokerError {
        BrokerError::connection(self.address(), err.to_string())
    }
}

impl Broker for RedisBroker {
    type Subscription = RedisSubscription;
    type Writer = RedisQueueWriter;

    #[instrument(name = "redis_broker_connect", skip(self), fields(address = %self.address()))]
    async fn connect(&mut self) -> Result<()> {
        let client = Client::open(self.connection_info()).map_err(|e| self.connection_error(e))?;

        let mut manager = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| self.connection_error(e))?;

        redis::cmd("PING")
            .query_async::<String>(&mut manager)
            .await
            .map_err(|e| self.connection_error(e))?;

        debug!(address = %self.address(), db = self.config.db, "Redis PING ok");

        self.client = Some(client);
        self.manager = Some(manager);
        Ok(())
    }

    #[instrument(name = "redis_broker_subscribe", skip(self), fields(channels = channels.len()))]
    async fn subscribe(&self, channels: &[String]) -> Result<RedisSubscription> {
        if channels.is_empty() {
            return Err(BrokerError::NoChannels);
        }
        let client = self.client.as_ref().ok_or(BrokerError::NotConnected)?;

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| BrokerError::subscribe(channels, e.to_string()))?;

        pubsub
            .subscribe(channels.to_vec())
            .await
            .map_err(|e| BrokerError::subscribe(channels, e.to_string()))?;

        debug!(?channels, "Redis subscription established");

        Ok(RedisSubscription {
            channels: channels.to_vec(),
            stream: Some(Box::pin(pubsub.into_on_message())),
        })
    }

    fn queue_writer(&self) -> Result<RedisQueueWriter> {
        let manager = self.manager.clone().ok_or(BrokerError::NotConnected)?;
        Ok(RedisQueueWriter { manager })
    }
}

/// Live Redis SUBSCRIBE connection
pub struct RedisSubscription {
    channels: Vec<String>,
    stream: Option<MessageStream>,
}

impl Subscription for RedisSubscription {
    fn channels(&self) -> &[String] {
        &self.channels
    }

    async fn next_message(&mut self) -> Option<InboundMessage> {
        let stream = self.stream.as_mut()?;
        let msg = stream.next().await?;
        Some(InboundMessage::new(
            msg.get_channel_name(),
            Bytes::copy_from_slice(msg.get_payload_bytes()),
        ))
    }

    async fn close(&mut self) -> std::result::Result<(), ContractError> {
        // Dropping the stream drops the pub/sub connection.
        if self.stream.take().is_some() {
            debug!(channels = ?self.channels, "Redis subscription closed");
        }
        Ok(())
    }
}

/// RPUSH-based queue writer
pub struct RedisQueueWriter {
    manager: ConnectionManager,
}

impl QueueWriter for RedisQueueWriter {
    fn name(&self) -> &str {
        "redis"
    }

    async fn append(&mut self, queue: &str, payload: &Bytes) -> std::result::Result<(), ContractError> {
        let _len: i64 = self
            .manager
            .rpush(queue, payload.as_ref())
            .await
            .map_err(|e| ContractError::queue_write(queue, e.to_string()))?;
        Ok(())
    }
}
