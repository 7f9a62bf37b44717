//! 日志初始化
//!
//! 终端输出始终开启；给出目录时额外写入按天轮转的日志文件（非阻塞写入）。

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// 未设置 `RUST_LOG` 时的默认过滤规则
const DEFAULT_DIRECTIVES: &str = "leap_tracker=info,leap_driver=info";

/// 日志文件名前缀（实际文件名追加日期后缀）
const LOG_FILE_PREFIX: &str = "leap-tracker.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// 安装全局 subscriber
///
/// 返回的 guard 需要一直持有，drop 时刷新尚未写出的文件日志。
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .context("Failed to install tracing subscriber")?;
            Ok(Some(guard))
        },
        None => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .try_init()
                .context("Failed to install tracing subscriber")?;
            Ok(None)
        },
    }
}
