//! 驱动层错误类型定义

use crate::state::TrackerState;
use leap_device::DeviceError;
use leap_kinematics::MetricConfigError;
use leap_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// 驱动层错误类型
///
/// 只在构造和生命周期操作中返回；帧处理过程中的错误不会以该类型离开轮询线程。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 设备错误
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// 日志文件无法创建
    #[error("Failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 日志表头写入失败
    #[error("Failed to write log header: {0}")]
    LogHeader(#[from] csv::Error),

    /// 实时消息 UDP 套接字错误
    #[error("Realtime socket error: {0}")]
    Socket(#[source] std::io::Error),

    /// 推送服务监听失败
    #[error("Push server error: {0}")]
    PushServer(#[source] std::io::Error),

    /// 指标参数无效
    #[error("Invalid metric configuration: {0}")]
    Metrics(#[from] MetricConfigError),

    /// 配置文件错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 当前状态不允许该操作
    #[error("Invalid tracker state: {0:?}")]
    InvalidState(TrackerState),

    /// 线程创建失败
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// 线程 join 失败（线程 panic）
    #[error("Thread join error: {0}")]
    ThreadJoin(String),
}

/// 输出通道错误
///
/// 由 [`SinkFanout`](crate::SinkFanout) 捕获、记录并计数，不会传递给轮询循环。
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] ProtocolError),

    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 部分独立发送失败
    #[error("{failed} of {total} sends failed")]
    Partial { failed: usize, total: usize },
}
