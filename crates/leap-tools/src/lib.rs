//! # Leap Tools - 会话日志分析
//!
//! **依赖原则**: 只依赖日志的列格式，不依赖驱动层
//!
//! ## 包含模块
//!
//! - `statistics` - 描述统计（纯函数）
//! - `analysis` - 读取会话日志、按练习与会话汇总、写出汇总表

pub mod analysis;
pub mod statistics;

pub use analysis::{
    AnalysisReport, Exercise, LoadedLogs, LogSample, SummaryRow, analyze_directory,
    analyze_exercise, load_logs, write_summary,
};
pub use statistics::Summary;
