//! # Leap Driver
//!
//! 手部追踪数据的轮询、逐帧处理与多通道分发：
//! - 轮询线程管理（打开连接、请求设备策略、停止时关闭连接）
//! - 逐帧构建记录并分发到 CSV 日志、OSC 实时消息、WebSocket 推送
//! - 通道失败隔离：单个通道出错只记录与计数，不影响其他通道和后续帧
//! - 原子计数器与生命周期状态，可在任意线程读取
//!
//! # Example
//!
//! ```no_run
//! use leap_device::{SyntheticConfig, SyntheticConnection};
//! use leap_driver::{TrackerBuilder, TrackerConfig};
//!
//! let config = TrackerConfig::load("tracker.toml").unwrap();
//! let mut tracker = TrackerBuilder::from_config(&config)
//!     .build(SyntheticConnection::new(SyntheticConfig::default()))
//!     .unwrap();
//! tracker.start().unwrap();
//! // ...
//! tracker.stop().unwrap();
//! println!("{:?}", tracker.metrics().snapshot());
//! ```

mod builder;
pub mod config;
mod error;
pub mod fanout;
pub mod metrics;
pub mod pipeline;
pub mod push;
pub mod sinks;
pub mod state;
mod tracker;

pub use builder::TrackerBuilder;
pub use config::TrackerConfig;
pub use error::{DriverError, SinkError};
pub use fanout::{FanoutReport, FrameProcessor, SinkFanout, local_timestamp};
pub use metrics::{MetricsSnapshot, TrackerMetrics};
pub use pipeline::{LoopContext, PollConfig, poll_loop};
pub use push::{BroadcastReport, PushServer};
pub use sinks::{FrameBatch, FrameSink, SinkKind};
pub use state::{AtomicTrackerState, TrackerState};
pub use tracker::Tracker;
