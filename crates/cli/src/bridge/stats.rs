//! Bridge run statistics.

use std::time::Duration;

use dispatcher::{DispatchReport, StopReason};

/// Statistics from a bridge run
#[derive(Debug, Clone)]
pub struct BridgeStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Number of subscribed channels
    pub channels: usize,

    /// Number of channel -> queue routes
    pub routes: usize,

    /// Report returned by the dispatcher task
    pub report: DispatchReport,
}

impl BridgeStats {
    /// Messages per second throughput
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.report.metrics.received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn stop_reason(&self) -> StopReason {
        self.report.reason
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Bridge Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stopped by: {}", self.report.reason);
        println!("   ├─ Channels: {}", self.channels);
        println!("   ├─ Routes: {}", self.routes);
        println!("   └─ Throughput: {:.2} msg/s", self.throughput());

        println!();
        print!("{}", self.report.summary);
        println!();
    }
}
