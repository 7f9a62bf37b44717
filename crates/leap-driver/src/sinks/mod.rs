//! 输出通道
//!
//! 每个通道独立渲染并发送一帧的全部记录：
//!
//! - [`LogSink`]: 追加写入 CSV 会话日志（每手一行）
//! - [`OscSink`]: 逐字段发送 OSC 浮点消息（每帧一条手部存在标志 + 每手 22 条）
//! - [`PushSink`]: 每帧一条 JSON 消息，广播给所有 WebSocket 客户端

pub mod log;
pub mod osc;
pub mod push;

pub use log::{LOG_HEADER, LogSink, log_file_name, log_row, resolve_log_path};
pub use osc::{OscSink, hand_field_values};
pub use push::{PushSink, frame_payload};

use crate::error::SinkError;
use leap_kinematics::FrameRecord;

/// 通道类别（用于日志和计数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Log,
    Osc,
    Push,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::Log => "log",
            SinkKind::Osc => "osc",
            SinkKind::Push => "push",
        }
    }
}

/// 一帧的输出数据
#[derive(Debug, Clone, Copy)]
pub struct FrameBatch<'a> {
    /// 帧时间戳（同一帧的所有记录共享）
    pub timestamp: &'a str,
    /// 帧中是否检测到手
    pub hand_present: bool,
    /// 每只手一条记录（按设备顺序）
    pub records: &'a [FrameRecord],
}

/// 输出通道
///
/// 实现只在轮询线程中调用，因此只要求 `Send`。
pub trait FrameSink: Send {
    fn kind(&self) -> SinkKind;

    /// 输出一帧
    ///
    /// 返回错误时，[`SinkFanout`](crate::SinkFanout) 负责记录和计数，
    /// 其余通道照常执行。
    fn dispatch(&mut self, batch: &FrameBatch<'_>) -> Result<(), SinkError>;

    /// 停止时调用（刷新缓冲区等）
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
