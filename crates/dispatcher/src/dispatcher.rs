//! Dispatcher - main loop for fan-out to queues

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use broker::Broker;
use contracts::{DispatchOutcome, InboundMessage, MappingTable, QueueWriter, Subscription};
use observability::{FanoutAggregator, FanoutSummary};

use crate::error::DispatcherError;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::shutdown::{DispatchSignals, DispatcherState};

/// Why the dispatcher loop exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested
    Cancelled,
    /// The subscription ended on its own
    SubscriptionEnded,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => f.write_str("shutdown requested"),
            Self::SubscriptionEnded => f.write_str("subscription ended"),
        }
    }
}

/// Final report returned by [`Dispatcher::run`]
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub reason: StopReason,
    pub metrics: MetricsSnapshot,
    pub summary: FanoutSummary,
}

/// Subscribe to every mapped channel and build a dispatcher
///
/// This is the only fallible step of the forwarding engine: either every
/// channel is subscribed or nothing runs.
#[instrument(
    name = "dispatcher_create",
    skip(broker, mapping),
    fields(channels = mapping.len(), routes = mapping.route_count())
)]
pub async fn create_dispatcher<B: Broker>(
    broker: &B,
    mapping: MappingTable,
) -> Result<Dispatcher<B::Subscription, B::Writer>, DispatcherError> {
    if mapping.is_empty() {
        return Err(DispatcherError::NoChannels);
    }

    let channels = mapping.channels();
    let subscription = broker
        .subscribe(&channels)
        .await
        .map_err(|e| DispatcherError::subscribe(channels.clone(), e))?;
    info!("Subscribed to channels: {:?}", channels);

    let writer = broker.queue_writer().map_err(DispatcherError::Writer)?;

    Ok(Dispatcher::new(Arc::new(mapping), subscription, writer))
}

/// Forwards subscription messages to their mapped queues
///
/// Owns the subscription and the writer exclusively; one message is fully
/// fanned out before the next is taken.
pub struct Dispatcher<S, W> {
    mapping: Arc<MappingTable>,
    subscription: S,
    writer: W,
    metrics: Arc<DispatcherMetrics>,
    aggregator: FanoutAggregator,
}

impl<S, W> Dispatcher<S, W>
where
    S: Subscription + 'static,
    W: QueueWriter + 'static,
{
    /// Create a dispatcher from an already-live subscription
    pub fn new(mapping: Arc<MappingTable>, subscription: S, writer: W) -> Self {
        Self {
            mapping,
            subscription,
            writer,
            metrics: Arc::new(DispatcherMetrics::new()),
            aggregator: FanoutAggregator::new(),
        }
    }

    /// Live counters, readable while the dispatcher runs
    pub fn metrics(&self) -> Arc<DispatcherMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Fan one message out to its mapped queues
    ///
    /// Queues are written one after another in mapping order. A failed
    /// append is reported and the remaining queues are still attempted.
    /// Returns an empty list for unmapped channels.
    pub async fn forward(&mut self, message: &InboundMessage) -> Vec<DispatchOutcome> {
        self.metrics.inc_received();
        observability::record_message_received(&message.channel);

        let Some(queues) = self.mapping.resolve(&message.channel) else {
            warn!(channel = %message.channel, "No mapping found for channel");
            self.metrics.inc_unmapped();
            self.aggregator.update_unmapped(&message.channel);
            observability::record_unmapped_message(&message.channel);
            return Vec::new();
        };

        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(queues.len());
        for queue in queues {
            match self.writer.append(queue, &message.payload).await {
                Ok(()) => {
                    info!(
                        channel = %message.channel,
                        queue = %queue,
                        "Message from channel {} pushed to queue {}",
                        message.channel,
                        queue
                    );
                    self.metrics.inc_appends_succeeded();
                    outcomes.push(DispatchOutcome::success(queue.as_str()));
                }
                Err(e) => {
                    error!(
                        channel = %message.channel,
                        queue = %queue,
                        error = %e,
                        "Failed to push message to queue {}",
                        queue
                    );
                    self.metrics.inc_appends_failed();
                    outcomes.push(DispatchOutcome::failure(queue.as_str(), e));
                }
            }
        }

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        observability::record_fanout(&outcomes, latency_ms);
        self.aggregator.update(&outcomes, latency_ms);
        outcomes
    }

    /// Run the dispatcher main loop
    ///
    /// Waits on the next message and the cancellation signal at once, so a
    /// shutdown is never stuck behind an idle channel. A fan-out already
    /// started always completes; if shutdown arrives during it the state
    /// moves to `Draining` until the last queue is written. Returns when shutdown is requested or the
    /// subscription ends; the subscription is closed exactly once and the
    /// state reaches `Stopped` before this returns.
    #[instrument(name = "dispatcher_run", skip_all)]
    pub async fn run(mut self, signals: DispatchSignals) -> DispatchReport {
        signals.transition(DispatcherState::Running);
        info!(
            channels = ?self.subscription.channels(),
            writer = self.writer.name(),
            "Dispatcher started"
        );

        let token = signals.cancellation().clone();
        let reason = loop {
            if token.is_cancelled() {
                break StopReason::Cancelled;
            }

            let next = tokio::select! {
                biased;
                _ = token.cancelled() => break StopReason::Cancelled,
                next = self.subscription.next_message() => next,
            };

            let Some(message) = next else {
                break StopReason::SubscriptionEnded;
            };

            // The fan-out is never dropped; a shutdown arriving mid-way only
            // moves the state to Draining while the remaining queues are written.
            {
                let fanout = self.forward(&message);
                tokio::pin!(fanout);
                tokio::select! {
                    biased;
                    _ = &mut fanout => {}
                    _ = token.cancelled() => {
                        signals.transition(DispatcherState::Draining);
                        info!(channel = %message.channel, "Shutdown requested, finishing in-flight fan-out");
                        fanout.await;
                    }
                }
            }

            let received = self.metrics.received();
            if received.is_multiple_of(100) {
                debug!(messages = received, "Dispatcher progress");
            }
        };

        signals.transition(DispatcherState::Draining);
        info!(reason = %reason, "Dispatcher stopping");

        if let Err(e) = self.subscription.close().await {
            warn!(error = %e, "Failed to close subscription");
        }

        let report = DispatchReport {
            reason,
            metrics: self.metrics.snapshot(),
            summary: self.aggregator.summary(),
        };

        signals.transition(DispatcherState::Stopped);
        info!(
            messages = report.metrics.received,
            appends = report.metrics.appends(),
            "Dispatcher stopped"
        );
        report
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self, signals: DispatchSignals) -> JoinHandle<DispatchReport> {
        tokio::spawn(self.run(signals))
    }
}
