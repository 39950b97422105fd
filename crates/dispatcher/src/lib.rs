//! # Dispatcher
//!
//! 转发引擎模块。
//!
//! 负责：
//! - 消费订阅消息 `InboundMessage`
//! - 按映射表 Fan-out 到多个队列
//! - 隔离单个队列的写入失败，不阻塞主链路
//! - 响应取消信号，完成正在进行的 fan-out 后停止

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod shutdown;

pub use contracts::{DispatchOutcome, InboundMessage, MappingTable};
pub use dispatcher::{create_dispatcher, DispatchReport, Dispatcher, StopReason};
pub use error::DispatcherError;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use shutdown::{DispatchSignals, DispatcherState, ShutdownCoordinator};
