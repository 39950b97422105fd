//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置文件 -> 映射表 -> 转发引擎 的完整链路
//! - 基于 MemoryBroker 的 e2e 场景（无需 Redis）
//! - 关闭语义与顺序保证

#[cfg(test)]
mod contract_tests {
    use contracts::{MappingTable, QueueList};

    #[test]
    fn test_resolve_preserves_configured_order() {
        let table = MappingTable::from_entries([(
            "events".to_string(),
            QueueList::new("events", vec!["b".into(), "a".into(), "c".into()]).unwrap(),
        )])
        .unwrap();

        assert_eq!(table.resolve("events").unwrap(), ["b", "a", "c"]);
        assert!(table.resolve("debug").is_none());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::time::Duration;

    use broker::{Broker, MemoryBroker, MemoryConfig, MemoryQueueWriter, MemorySubscription};
    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use dispatcher::{
        create_dispatcher, DispatchReport, Dispatcher, DispatcherState, ShutdownCoordinator,
        StopReason,
    };
    use tokio::task::JoinHandle;

    const WAIT: Duration = Duration::from_secs(5);

    /// A dispatcher running against a memory broker
    struct Harness {
        broker: MemoryBroker,
        coordinator: ShutdownCoordinator,
        handle: JoinHandle<DispatchReport>,
    }

    impl Harness {
        async fn start(yaml: &str, memory: MemoryConfig) -> Self {
            let config = ConfigLoader::load_with_env(yaml, ConfigFormat::Yaml, None).unwrap();
            let mut broker = MemoryBroker::with_config(memory);
            broker.connect().await.unwrap();

            let dispatcher: Dispatcher<MemorySubscription, MemoryQueueWriter> =
                create_dispatcher(&broker, config.mappings).await.unwrap();
            let (coordinator, signals) = ShutdownCoordinator::new();
            let handle = dispatcher.spawn(signals);

            Self {
                broker,
                coordinator,
                handle,
            }
        }

        async fn wait_for_appends(&self, count: usize) {
            tokio::time::timeout(WAIT, async {
                while self.broker.append_log().len() < count {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("appends not observed");
        }

        async fn stop(self) -> (MemoryBroker, DispatchReport) {
            tokio::time::timeout(WAIT, self.coordinator.shutdown())
                .await
                .expect("dispatcher did not complete");
            let report = self.handle.await.unwrap();
            (self.broker, report)
        }
    }

    /// Scenario A: one channel, one queue
    #[tokio::test]
    async fn test_scenario_single_queue() {
        let harness = Harness::start(
            "mappings:\n  orders: orders-queue\n",
            MemoryConfig::default(),
        )
        .await;

        harness.broker.publish("orders", "order-42");
        harness.wait_for_appends(1).await;
        let (broker, report) = harness.stop().await;

        let log = broker.append_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].queue, "orders-queue");
        assert_eq!(log[0].payload, Bytes::from("order-42"));
        assert_eq!(broker.pop("orders-queue"), Some(Bytes::from("order-42")));
        assert_eq!(report.metrics.appends_succeeded, 1);
    }

    /// Scenario B: one channel fanned out to two queues
    #[tokio::test]
    async fn test_scenario_fan_out() {
        let harness = Harness::start(
            "mappings:\n  events:\n    - events-queue\n    - audit-queue\n",
            MemoryConfig::default(),
        )
        .await;

        harness.broker.publish("events", "evt-1");
        harness.wait_for_appends(2).await;
        let (broker, _) = harness.stop().await;

        let log: Vec<_> = broker
            .append_log()
            .into_iter()
            .map(|r| (r.queue, r.payload))
            .collect();
        assert_eq!(
            log,
            vec![
                ("events-queue".to_string(), Bytes::from("evt-1")),
                ("audit-queue".to_string(), Bytes::from("evt-1")),
            ]
        );
    }

    /// Scenario C: unmapped channel is skipped, later messages still flow
    #[tokio::test]
    async fn test_scenario_unmapped_channel() {
        let harness = Harness::start(
            "mappings:\n  orders: orders-queue\n",
            MemoryConfig::default(),
        )
        .await;

        // Not subscribed, so the broker never delivers it
        assert_eq!(harness.broker.publish("debug", "noise"), 0);
        harness.broker.publish("orders", "order-1");
        harness.wait_for_appends(1).await;
        let (broker, report) = harness.stop().await;

        assert_eq!(broker.append_log().len(), 1);
        assert_eq!(broker.queue_contents("orders-queue"), vec![Bytes::from("order-1")]);
        assert_eq!(report.metrics.received, 1);
    }

    /// Scenario C through the engine itself: a message on a channel with no
    /// mapping reaches the dispatcher but produces no append
    #[tokio::test]
    async fn test_unmapped_message_reaching_dispatcher() {
        let config =
            ConfigLoader::load_with_env("mappings:\n  orders: orders-queue\n", ConfigFormat::Yaml, None)
                .unwrap();
        let mut broker = MemoryBroker::new();
        broker.connect().await.unwrap();
        let mut dispatcher = create_dispatcher(&broker, config.mappings).await.unwrap();

        let outcomes = dispatcher
            .forward(&contracts::InboundMessage::new("debug", "noise"))
            .await;
        assert!(outcomes.is_empty());

        let outcomes = dispatcher
            .forward(&contracts::InboundMessage::new("orders", "order-1"))
            .await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_success());

        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.unmapped, 1);
        assert_eq!(snapshot.appends_succeeded, 1);
        assert_eq!(broker.append_log().len(), 1);
    }

    /// A stray delivery on an unmapped channel is skipped by the running
    /// loop and the next mapped message is still forwarded
    #[tokio::test]
    async fn test_unmapped_delivery_keeps_loop_running() {
        let harness = Harness::start(
            "mappings:\n  orders: orders-queue\n",
            MemoryConfig::default(),
        )
        .await;

        assert_eq!(harness.broker.inject("debug", "noise"), 1);
        harness.broker.publish("orders", "order-1");
        harness.wait_for_appends(1).await;
        assert_eq!(harness.coordinator.state(), DispatcherState::Running);

        let (broker, report) = harness.stop().await;
        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.metrics.received, 2);
        assert_eq!(report.metrics.unmapped, 1);
        assert_eq!(report.metrics.appends_succeeded, 1);
        assert_eq!(broker.append_log().len(), 1);
        assert_eq!(broker.queue_contents("orders-queue"), vec![Bytes::from("order-1")]);
    }

    /// Scenario D: shutdown with nothing pending completes promptly
    #[tokio::test]
    async fn test_scenario_idle_shutdown() {
        let harness = Harness::start(
            "mappings:\n  orders: orders-queue\n",
            MemoryConfig::default(),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (broker, report) = harness.stop().await;
        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.metrics.received, 0);
        assert!(broker.append_log().is_empty());
        assert_eq!(broker.subscription_closes(), 1);
    }

    /// A failing queue does not stop the rest of the fan-out or later messages
    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let harness = Harness::start(
            "mappings:\n  events: [q1, q2, q3]\n",
            MemoryConfig {
                fail_queues: vec!["q2".to_string()],
                ..Default::default()
            },
        )
        .await;

        harness.broker.publish("events", "m1");
        harness.wait_for_appends(3).await;
        harness.broker.set_queue_failing("q2", false);
        harness.broker.publish("events", "m2");
        harness.wait_for_appends(6).await;
        let (broker, report) = harness.stop().await;

        assert_eq!(broker.queue_contents("q1").len(), 2);
        assert_eq!(broker.queue_contents("q2"), vec![Bytes::from("m2")]);
        assert_eq!(broker.queue_contents("q3").len(), 2);
        assert_eq!(report.metrics.appends_failed, 1);
        assert_eq!(report.metrics.appends_succeeded, 5);

        let counts = report.summary.queue_counts.get("q2").unwrap();
        assert_eq!((counts.succeeded, counts.failed), (1, 1));
    }

    /// Appends for M1 all finish before any append for M2 starts
    #[tokio::test]
    async fn test_message_ordering() {
        let harness = Harness::start(
            "mappings:\n  events: [q1, q2]\n",
            MemoryConfig {
                append_delay: Some(Duration::from_millis(10)),
                ..Default::default()
            },
        )
        .await;

        for payload in ["m1", "m2", "m3"] {
            harness.broker.publish("events", payload);
        }
        harness.wait_for_appends(6).await;
        let (broker, _) = harness.stop().await;

        let payloads: Vec<_> = broker.append_log().into_iter().map(|r| r.payload).collect();
        let expected: Vec<Bytes> = ["m1", "m1", "m2", "m2", "m3", "m3"]
            .into_iter()
            .map(Bytes::from)
            .collect();
        assert_eq!(payloads, expected);
    }

    /// Calling shutdown repeatedly is one graceful stop
    #[tokio::test]
    async fn test_shutdown_idempotent() {
        let harness = Harness::start(
            "mappings:\n  orders: orders-queue\n",
            MemoryConfig::default(),
        )
        .await;

        let first = harness.coordinator.request_shutdown();
        let second = harness.coordinator.clone().request_shutdown();
        assert!(first);
        assert!(!second);

        tokio::time::timeout(WAIT, harness.coordinator.await_completion())
            .await
            .expect("dispatcher did not complete");
        // Completion is sticky
        harness.coordinator.await_completion().await;
        assert_eq!(harness.coordinator.state(), DispatcherState::Stopped);

        let (broker, report) = harness.stop().await;
        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(broker.subscription_closes(), 1);
    }

    /// Payloads pass through byte-for-byte
    #[tokio::test]
    async fn test_binary_payload_unmodified() {
        let harness = Harness::start(
            "mappings:\n  blobs: blob-queue\n",
            MemoryConfig::default(),
        )
        .await;

        let payload = Bytes::from_static(&[0x00, 0xff, 0x10, b'\n', 0x80]);
        harness.broker.publish("blobs", payload.clone());
        harness.wait_for_appends(1).await;
        let (broker, _) = harness.stop().await;

        assert_eq!(broker.queue_contents("blob-queue"), vec![payload]);
    }

    /// Config file through to forwarding, mixed single and list mappings
    #[tokio::test]
    async fn test_config_file_to_forwarding() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(
            br#"
[redis]
host = "localhost"

[mappings]
notifications = "notifications-queue"
events = ["events-queue", "audit-queue"]
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.mappings.route_count(), 3);

        let mut broker = MemoryBroker::new();
        broker.connect().await.unwrap();
        let dispatcher = create_dispatcher(&broker, config.mappings).await.unwrap();
        let (coordinator, signals) = ShutdownCoordinator::new();
        let handle = dispatcher.spawn(signals);

        broker.publish("notifications", "n-1");
        broker.publish("events", "e-1");
        tokio::time::timeout(WAIT, async {
            while broker.append_log().len() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("appends not observed");

        coordinator.shutdown().await;
        let report = handle.await.unwrap();

        assert_eq!(report.summary.messages, 2);
        assert_eq!(broker.queue_contents("notifications-queue"), vec![Bytes::from("n-1")]);
        assert_eq!(broker.queue_contents("events-queue"), vec![Bytes::from("e-1")]);
        assert_eq!(broker.queue_contents("audit-queue"), vec![Bytes::from("e-1")]);
    }

    /// Subscription ending on its own stops the dispatcher without a request
    #[tokio::test]
    async fn test_subscription_loss_completes() {
        let harness = Harness::start(
            "mappings:\n  orders: orders-queue\n",
            MemoryConfig::default(),
        )
        .await;

        harness.broker.disconnect_subscribers();
        tokio::time::timeout(WAIT, harness.coordinator.await_completion())
            .await
            .expect("dispatcher did not complete");
        assert!(!harness.coordinator.is_shutdown_requested());

        let (_, report) = harness.stop().await;
        assert_eq!(report.reason, StopReason::SubscriptionEnded);
    }
}
