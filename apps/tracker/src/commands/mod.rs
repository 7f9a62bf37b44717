//! 子命令实现

pub mod analyze;
pub mod config;
pub mod track;

pub use analyze::AnalyzeCommand;
pub use config::ConfigCommand;
pub use track::TrackCommand;
