//! # Leap Device Layer
//!
//! 追踪设备连接抽象层，屏蔽具体设备服务/SDK 的差异。
//!
//! 真实设备适配器（例如基于厂商 C SDK 的绑定）只需实现 [`TrackingConnection`]，
//! 即可接入 `leap-driver` 的轮询循环。本 crate 自带两种无硬件数据源：
//!
//! - `mock`: 脚本化事件序列，用于测试（需启用 `mock` feature）
//! - `synthetic`: 合成手部动作，用于无设备时联调下游（OSC/WebSocket 客户端）

use std::time::Duration;
use thiserror::Error;

// 重新导出 leap-protocol 中的帧类型
pub use leap_protocol::Frame;

#[cfg(feature = "mock")]
pub mod mock;

pub mod synthetic;

#[cfg(feature = "mock")]
pub use mock::{MockConnection, MockHandle};
pub use synthetic::{SyntheticConfig, SyntheticConnection, synthetic_hand};

/// 设备层统一错误类型
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device Error: {0}")]
    Device(#[from] DeviceFault),
    #[error("Poll timeout")]
    Timeout,
    #[error("Connection not open")]
    NotOpen,
}

impl DeviceError {
    /// 轮询超时属于正常现象（视野中无事件）
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeviceError::Timeout)
    }
}

/// 设备/服务错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFaultKind {
    Unknown,
    /// 追踪服务未运行或不可达
    ServiceUnavailable,
    /// 未检测到追踪设备
    NoDevice,
    /// 请求的策略不被服务支持
    UnsupportedPolicy,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct DeviceFault {
    pub kind: DeviceFaultKind,
    pub message: String,
}

impl DeviceFault {
    pub fn new(kind: DeviceFaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&str> for DeviceFault {
    fn from(message: &str) -> Self {
        Self::new(DeviceFaultKind::Unknown, message)
    }
}

/// 设备策略标志（位掩码）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PolicyFlags(u32);

impl PolicyFlags {
    pub const NONE: Self = Self(0);
    /// 允许后台帧（应用失去焦点时继续追踪）
    pub const BACKGROUND_FRAMES: Self = Self(0x0000_0001);
    /// 请求相机图像
    pub const IMAGES: Self = Self(0x0000_0002);
    /// 优化头戴模式
    pub const OPTIMIZE_HMD: Self = Self(0x0000_0004);
    /// 请求映射点
    pub const MAP_POINTS: Self = Self(0x0000_0080);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for PolicyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// 一次成功轮询得到的事件
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// 与追踪服务建立连接
    Connection,
    /// 与追踪服务断开连接
    ConnectionLost,
    /// 追踪帧
    Tracking(Frame),
    /// 其他事件（设备插拔、日志、策略变更等），轮询循环忽略
    Other(&'static str),
}

/// 追踪设备连接
///
/// 连接对象在轮询线程中独占使用，因此只要求 `Send`。
///
/// 生命周期：`open()` → 多次 `poll()` → `close()`。
pub trait TrackingConnection {
    /// 打开连接
    ///
    /// 失败时轮询循环直接退出（不进入轮询阶段）。
    fn open(&mut self) -> Result<(), DeviceError>;

    /// 轮询一个事件，最多阻塞 `timeout`
    ///
    /// 没有事件时返回 `DeviceError::Timeout`。
    fn poll(&mut self, timeout: Duration) -> Result<DeviceEvent, DeviceError>;

    /// 设置/清除策略标志
    fn set_policy(&mut self, set: PolicyFlags, clear: PolicyFlags) -> Result<(), DeviceError>;

    /// 关闭连接（幂等）
    fn close(&mut self) {}

    /// 连接描述（用于日志）
    fn describe(&self) -> String {
        "tracking connection".to_string()
    }
}

impl<T: TrackingConnection + ?Sized> TrackingConnection for Box<T> {
    fn open(&mut self) -> Result<(), DeviceError> {
        (**self).open()
    }

    fn poll(&mut self, timeout: Duration) -> Result<DeviceEvent, DeviceError> {
        (**self).poll(timeout)
    }

    fn set_policy(&mut self, set: PolicyFlags, clear: PolicyFlags) -> Result<(), DeviceError> {
        (**self).set_policy(set, clear)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
