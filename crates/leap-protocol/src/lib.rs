//! # Leap Protocol
//!
//! 手部追踪数据模型与实时消息协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `hand`: 手部骨骼数据模型（Vector3、Bone、Digit、Palm、Arm、Hand、Frame）
//! - `addresses`: 实时消息地址常量（`/leap/*`）
//! - `osc`: OSC 1.0 单浮点消息编解码
//!
//! ## 字节序
//!
//! OSC 协议使用大端字节序，所有 32 位整数与浮点数均按网络字节序写入。

pub mod addresses;
pub mod hand;
pub mod osc;

// 重新导出常用类型
pub use addresses::*;
pub use hand::*;
pub use osc::{OscMessage, decode_float_message, encode_float_message};

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 帧声明的手数与实际手数组长度不一致
    #[error("Hand count mismatch: frame declares {declared}, carries {actual}")]
    HandCountMismatch { declared: u32, actual: usize },

    /// 每只手应包含 5 根手指
    #[error("Invalid digit count: expected 5, got {0}")]
    InvalidDigitCount(usize),

    /// OSC 地址非法（必须以 '/' 开头，且不包含 NUL 字符）
    #[error("Invalid OSC address: {0:?}")]
    InvalidAddress(String),

    /// 编码后的消息超过单个数据报缓冲区
    #[error("Message too large: {size} bytes (limit {limit})")]
    MessageTooLarge { size: usize, limit: usize },

    /// 解码时数据长度不足或未对齐
    #[error("Invalid message length: {0} bytes")]
    InvalidLength(usize),

    /// 解码时遇到不支持的类型标签
    #[error("Unsupported type tag: {0:?}")]
    UnsupportedTypeTag(String),
}
