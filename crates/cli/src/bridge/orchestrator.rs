//! Bridge orchestrator - wires the store, the dispatcher and shutdown.
//!
//! Uses the Redis broker when the `real-redis` feature is enabled, otherwise
//! runs against the in-memory broker.

use std::future::Future;
use std::time::Instant;

use anyhow::{Context, Result};
use broker::Broker;
use contracts::BridgeConfig;
use dispatcher::{create_dispatcher, ShutdownCoordinator, StopReason};
use tracing::{info, warn};

use super::BridgeStats;
use crate::error::CliError;

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Normalized configuration
    pub config: BridgeConfig,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main bridge orchestrator
pub struct Bridge {
    options: BridgeOptions,
}

impl Bridge {
    /// Create a new bridge with the given options
    pub fn new(options: BridgeOptions) -> Self {
        Self { options }
    }

    /// Run the bridge until `shutdown` resolves or the subscription ends
    pub async fn run<F>(self, shutdown: F) -> Result<BridgeStats>
    where
        F: Future<Output = ()>,
    {
        if let Some(port) = self.options.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        #[cfg(feature = "real-redis")]
        let broker = broker::RedisBroker::new(self.options.config.redis.clone());

        #[cfg(not(feature = "real-redis"))]
        let broker = {
            info!("Running in MEMORY mode (no Redis server required)");
            broker::MemoryBroker::new()
        };

        self.run_with_broker(broker, shutdown).await
    }

    /// Connect, subscribe, forward until stopped, then shut down
    ///
    /// Connection and subscription failures are startup-fatal; nothing is
    /// spawned unless every channel is subscribed. A subscription that ends
    /// without `shutdown` resolving is also an error, so the process exits
    /// non-zero.
    pub async fn run_with_broker<B, F>(&self, mut broker: B, shutdown: F) -> Result<BridgeStats>
    where
        B: Broker,
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let config = &self.options.config;

        info!(address = %config.redis.address(), db = config.redis.db, "Connecting to Redis...");
        broker
            .connect()
            .await
            .map_err(|e| CliError::redis_connection(config.redis.address(), e.to_string()))?;
        info!("Successfully connected to Redis");

        let channels = config.mappings.len();
        let routes = config.mappings.route_count();

        let dispatcher = create_dispatcher(&broker, config.mappings.clone())
            .await
            .map_err(|e| CliError::subscribe(e.to_string()))?;

        let (coordinator, signals) = ShutdownCoordinator::new();
        let handle = dispatcher.spawn(signals);

        info!(channels, routes, "Bridge running");

        let requested = tokio::select! {
            _ = shutdown => {
                info!("Received shutdown signal");
                true
            }
            _ = coordinator.await_completion() => {
                warn!("Subscription ended, stopping bridge");
                false
            }
        };

        coordinator.shutdown().await;

        let report = handle
            .await
            .map_err(|e| CliError::shutdown(e.to_string()))
            .context("Dispatcher task failed")?;

        let stats = BridgeStats {
            duration: start_time.elapsed(),
            channels,
            routes,
            report,
        };

        info!(
            messages = stats.report.metrics.received,
            appends = stats.report.metrics.appends(),
            duration_secs = stats.duration.as_secs_f64(),
            "Bridge shutdown complete"
        );

        if !requested && stats.stop_reason() == StopReason::SubscriptionEnded {
            return Err(CliError::subscription_lost(stats.report.metrics.received).into());
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use broker::{MemoryBroker, MemoryConfig};
    use bytes::Bytes;
    use tokio::sync::oneshot;

    fn options(yaml: &str) -> BridgeOptions {
        let config =
            config_loader::ConfigLoader::load_with_env(yaml, config_loader::ConfigFormat::Yaml, None)
                .unwrap();
        BridgeOptions {
            config,
            metrics_port: None,
        }
    }

    async fn wait_until(check: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn test_forwards_until_shutdown() {
        let bridge = Bridge::new(options(
            "mappings:\n  orders: orders-queue\n  events: [events-queue, audit-queue]\n",
        ));
        let broker = MemoryBroker::new();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let run = tokio::spawn({
            let broker = broker.clone();
            async move {
                bridge
                    .run_with_broker(broker, async {
                        stop_rx.await.ok();
                    })
                    .await
            }
        });

        wait_until(|| broker.subscriber_count() == 1).await;
        broker.publish("orders", "order-42");
        broker.publish("events", "evt-1");
        wait_until(|| broker.append_log().len() == 3).await;

        stop_tx.send(()).unwrap();
        let stats = tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("bridge did not stop")
            .unwrap()
            .unwrap();

        assert_eq!(stats.stop_reason(), StopReason::Cancelled);
        assert_eq!(stats.channels, 2);
        assert_eq!(stats.routes, 3);
        assert_eq!(stats.report.metrics.received, 2);
        assert_eq!(broker.queue_contents("orders-queue"), vec![Bytes::from("order-42")]);
        assert_eq!(broker.queue_contents("audit-queue"), vec![Bytes::from("evt-1")]);
        assert_eq!(broker.subscription_closes(), 1);
    }

    #[tokio::test]
    async fn test_subscription_loss_is_error() {
        let bridge = Bridge::new(options("mappings:\n  orders: orders-queue\n"));
        let broker = MemoryBroker::new();

        let run = tokio::spawn({
            let broker = broker.clone();
            async move {
                bridge
                    .run_with_broker(broker, std::future::pending::<()>())
                    .await
            }
        });

        wait_until(|| broker.subscriber_count() == 1).await;
        broker.publish("orders", "order-1");
        wait_until(|| broker.append_log().len() == 1).await;
        broker.disconnect_subscribers();

        let err = tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("bridge did not stop")
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::SubscriptionLost { messages: 1 })
        ));
        assert_eq!(broker.subscription_closes(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_fatal() {
        let bridge = Bridge::new(options("mappings:\n  orders: orders-queue\n"));
        let broker = MemoryBroker::with_config(MemoryConfig {
            fail_connect: true,
            ..Default::default()
        });

        let err = bridge
            .run_with_broker(broker, std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to connect to Redis"));
    }

    #[tokio::test]
    async fn test_empty_mappings_is_fatal() {
        let bridge = Bridge::new(options("redis:\n  host: localhost\n"));
        let broker = MemoryBroker::new();

        let err = bridge
            .run_with_broker(broker.clone(), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no channel mappings configured"));
        assert_eq!(broker.subscriber_count(), 0);
    }
}
