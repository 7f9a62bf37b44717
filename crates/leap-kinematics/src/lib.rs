//! # Leap Kinematics
//!
//! 手部关节几何与康复训练指标。
//!
//! - [`math`]: 距离、关节角、姿态角、腕部角度
//! - [`metrics`]: 握拳 / 前臂旋转 / 腕活动度三项归一化指标
//! - [`record`]: 逐手逐帧输出记录的组装
//!
//! 本 crate 不做 I/O，也不保存跨帧状态。

pub mod math;
pub mod metrics;
pub mod record;

pub use metrics::{MetricConfig, MetricConfigError, MetricEngine, MetricSet};
pub use record::{
    DigitDistances, FrameRecord, FrameRecordBuilder, JointAngles, Orientation, PalmData,
    SessionContext, WristData,
};
