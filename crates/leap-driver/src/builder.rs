//! Builder 模式实现
//!
//! 提供链式构造 [`Tracker`] 的便捷方式。

use crate::config::{DEFAULT_PUSH_PORT, DEFAULT_REALTIME_PORT, TrackerConfig};
use crate::error::DriverError;
use crate::fanout::{FrameProcessor, SinkFanout};
use crate::metrics::TrackerMetrics;
use crate::pipeline::PollConfig;
use crate::push::PushServer;
use crate::sinks::{FrameSink, LogSink, OscSink, PushSink};
use crate::tracker::{PendingLoop, Tracker};
use leap_device::TrackingConnection;
use leap_kinematics::{FrameRecordBuilder, MetricConfig, SessionContext};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Tracker Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use leap_device::{SyntheticConfig, SyntheticConnection};
/// use leap_driver::TrackerBuilder;
/// use leap_kinematics::SessionContext;
///
/// let mut tracker = TrackerBuilder::new(SessionContext::new("Alice", 1, "make_a_fist"))
///     .log_dir("logs")
///     .realtime_target("127.0.0.1", 9000)
///     .push_port(8080)
///     .build(SyntheticConnection::new(SyntheticConfig::default()))
///     .unwrap();
/// tracker.start().unwrap();
/// ```
pub struct TrackerBuilder {
    session: SessionContext,
    /// 日志目录（默认当前目录）
    log_dir: PathBuf,
    realtime_host: String,
    realtime_port: u16,
    /// 推送端口（None 表示不启用推送服务）
    push_port: Option<u16>,
    push_queue_capacity: usize,
    poll_config: PollConfig,
    metric_config: MetricConfig,
    extra_sinks: Vec<Box<dyn FrameSink>>,
}

impl TrackerBuilder {
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            log_dir: PathBuf::from("."),
            realtime_host: "127.0.0.1".to_string(),
            realtime_port: DEFAULT_REALTIME_PORT,
            push_port: Some(DEFAULT_PUSH_PORT),
            push_queue_capacity: 64,
            poll_config: PollConfig::default(),
            metric_config: MetricConfig::default(),
            extra_sinks: Vec::new(),
        }
    }

    /// 从配置文件内容构造
    pub fn from_config(config: &TrackerConfig) -> Self {
        let builder = Self::new(config.session.to_context())
            .log_dir(config.output.log_dir.clone())
            .realtime_target(config.realtime.host.clone(), config.realtime.port)
            .push_queue_capacity(config.push.client_queue_capacity)
            .poll_timeout(config.device.poll_timeout())
            .metric_config(config.metrics);
        if config.push.enabled {
            builder.push_port(config.push.port)
        } else {
            builder.disable_push()
        }
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// 实时消息（UDP）目标
    pub fn realtime_target(mut self, host: impl Into<String>, port: u16) -> Self {
        self.realtime_host = host.into();
        self.realtime_port = port;
        self
    }

    /// 推送服务监听端口（0 表示由系统分配）
    pub fn push_port(mut self, port: u16) -> Self {
        self.push_port = Some(port);
        self
    }

    pub fn disable_push(mut self) -> Self {
        self.push_port = None;
        self
    }

    pub fn push_queue_capacity(mut self, capacity: usize) -> Self {
        self.push_queue_capacity = capacity;
        self
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_config.poll_timeout = timeout;
        self
    }

    pub fn poll_config(mut self, config: PollConfig) -> Self {
        self.poll_config = config;
        self
    }

    pub fn metric_config(mut self, config: MetricConfig) -> Self {
        self.metric_config = config;
        self
    }

    /// 追加自定义通道（排在内置通道之后）
    pub fn sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.extra_sinks.push(sink);
        self
    }

    /// 构造 Tracker（不启动轮询）
    ///
    /// 内置通道的分发顺序：实时消息、日志、推送。
    ///
    /// # 错误
    /// - `DriverError::Metrics`: 指标参数无效
    /// - `DriverError::Config`: 推送队列长度或轮询超时为 0
    /// - `DriverError::Socket`: 实时消息套接字创建失败
    /// - `DriverError::PushServer`: 推送端口监听失败
    /// - `DriverError::LogFile` / `DriverError::LogHeader`: 日志文件创建失败
    pub fn build(
        self,
        connection: impl TrackingConnection + Send + 'static,
    ) -> Result<Tracker, DriverError> {
        let records = FrameRecordBuilder::new(self.metric_config)?;
        if self.push_queue_capacity == 0 {
            return Err(DriverError::Config(
                "push queue capacity must be at least 1".to_string(),
            ));
        }
        if self.poll_config.poll_timeout.is_zero() {
            return Err(DriverError::Config("poll timeout must be non-zero".to_string()));
        }

        let metrics = Arc::new(TrackerMetrics::new());

        let osc = OscSink::connect(&self.realtime_host, self.realtime_port, metrics.clone())?;
        let push = match self.push_port {
            Some(port) => Some(Arc::new(PushServer::bind(port, self.push_queue_capacity)?)),
            None => None,
        };
        // 日志文件最后创建，前面失败时不留下空日志
        let log = LogSink::create(&self.log_dir, &self.session, metrics.clone())?;
        let session = log.session().clone();
        let log_path = log.path().to_path_buf();

        let mut fanout = SinkFanout::new(metrics.clone());
        fanout.push(Box::new(osc));
        fanout.push(Box::new(log));
        if let Some(server) = &push {
            fanout.push(Box::new(PushSink::new(server.clone(), metrics.clone())));
        }
        for sink in self.extra_sinks {
            fanout.push(sink);
        }

        let processor = FrameProcessor::new(session.clone(), records, fanout, metrics.clone());
        let pending = PendingLoop {
            connection: Box::new(connection),
            processor,
            config: self.poll_config,
        };

        Ok(Tracker::new(pending, session, log_path, push, metrics))
    }
}
