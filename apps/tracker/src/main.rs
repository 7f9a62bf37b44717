//! # Leap Tracker
//!
//! 手部追踪命令行工具。
//!
//! ```bash
//! # 追踪：写会话日志，向 192.168.1.20:9000 发送 OSC，在 8080 端口推送 JSON
//! leap-tracker track Alice 1 make_a_fist 192.168.1.20 9000 8080
//!
//! # 使用配置文件，命令行参数覆盖文件中的值
//! leap-tracker track --config tracker.toml Bob
//!
//! # 会后分析：为目录中的日志生成各动作的统计摘要
//! leap-tracker analyze ./logs --output ./plots
//! ```
//!
//! 追踪期间输入 `quit` 或按 Ctrl+C 停止。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

use commands::{AnalyzeCommand, ConfigCommand, TrackCommand};

/// Leap Tracker - 手部追踪与康复训练记录工具
#[derive(Parser, Debug)]
#[command(name = "leap-tracker")]
#[command(
    about = "Hand tracking to CSV log, OSC and WebSocket, with post-session analysis",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// 日志文件目录（按天轮转；不指定时只输出到终端）
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 开始追踪
    Track {
        #[command(flatten)]
        args: TrackCommand,
    },

    /// 分析会话日志
    Analyze {
        #[command(flatten)]
        args: AnalyzeCommand,
    },

    /// 输出默认配置文件
    Config {
        #[command(flatten)]
        args: ConfigCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // guard 必须存活到进程退出，否则文件日志不会刷新
    let _guard = logging::init(cli.log_dir.as_deref())?;

    match cli.command {
        Commands::Track { args } => args.execute(),
        Commands::Analyze { args } => args.execute(),
        Commands::Config { args } => args.execute(),
    }
}
