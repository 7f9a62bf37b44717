//! 追踪命令
//!
//! 参数顺序与早期版本的命令行保持一致：
//! `<client_name> <session_number> <exercise_name> <osc_ip> <osc_port> <websocket_port>`。
//! 位置参数全部可选，未给出的值取自 `--config` 文件或默认配置。

use anyhow::{Context, Result};
use clap::Args;
use leap_device::{SyntheticConfig, SyntheticConnection};
use leap_driver::{Tracker, TrackerBuilder, TrackerConfig, TrackerState};
use leap_protocol::HandSide;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// 主线程检查停止条件的间隔
const WAIT_TICK: Duration = Duration::from_millis(100);

/// 追踪命令参数
#[derive(Args, Debug)]
pub struct TrackCommand {
    /// 客户名称
    pub client_name: Option<String>,

    /// 会话编号（同名日志已存在时自动递增）
    pub session_number: Option<u32>,

    /// 练习名称
    pub exercise_name: Option<String>,

    /// OSC 目标地址
    pub osc_ip: Option<String>,

    /// OSC 目标端口
    pub osc_port: Option<u16>,

    /// WebSocket 推送端口
    pub ws_port: Option<u16>,

    /// 配置文件（TOML）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 会话日志目录
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// 关闭 WebSocket 推送
    #[arg(long)]
    pub no_push: bool,

    /// 追踪时长（秒），0 表示直到输入 quit 或 Ctrl+C
    #[arg(short, long, default_value_t = 0)]
    pub duration: u64,

    /// 合成数据源帧率（Hz）
    #[arg(long, default_value_t = 60.0)]
    pub frame_rate: f64,

    /// 合成数据源同时产生左右手
    #[arg(long)]
    pub both_hands: bool,

    /// 合成数据源随机种子
    #[arg(long)]
    pub seed: Option<u64>,
}

impl TrackCommand {
    /// 合并配置文件与命令行参数（命令行优先）
    pub fn resolve_config(&self) -> Result<TrackerConfig> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::load(path)?,
            None => TrackerConfig::default(),
        };

        if let Some(name) = &self.client_name {
            config.session.client_name = name.clone();
        }
        if let Some(number) = self.session_number {
            config.session.session_number = number;
        }
        if let Some(exercise) = &self.exercise_name {
            config.session.exercise_name = exercise.clone();
        }
        if let Some(host) = &self.osc_ip {
            config.realtime.host = host.clone();
        }
        if let Some(port) = self.osc_port {
            config.realtime.port = port;
        }
        if let Some(port) = self.ws_port {
            config.push.port = port;
        }
        if let Some(dir) = &self.output_dir {
            config.output.log_dir = dir.clone();
        }
        if self.no_push {
            config.push.enabled = false;
        }

        config.validate()?;
        Ok(config)
    }

    fn synthetic_config(&self) -> SyntheticConfig {
        let sides = if self.both_hands {
            vec![HandSide::Left, HandSide::Right]
        } else {
            vec![HandSide::Right]
        };
        SyntheticConfig {
            frame_rate_hz: self.frame_rate,
            sides,
            seed: self.seed,
            ..Default::default()
        }
    }

    /// 执行追踪，阻塞直到停止条件满足
    pub fn execute(&self) -> Result<()> {
        let config = self.resolve_config()?;
        let log_dir = &config.output.log_dir;
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
        let source = SyntheticConnection::new(self.synthetic_config());

        let mut tracker = match TrackerBuilder::from_config(&config).build(source) {
            Ok(tracker) => tracker,
            Err(e) => {
                error!("Failed to initialise tracker: {e}");
                return Err(e).context("Failed to initialise tracker");
            },
        };

        println!("Session log: {}", tracker.log_path().display());
        println!("OSC target:  {}:{}", config.realtime.host, config.realtime.port);
        if let Some(addr) = tracker.push_addr() {
            println!("Push server: ws://{addr}");
        }

        let stop = Arc::new(AtomicBool::new(false));
        let stop_signal = stop.clone();
        ctrlc::set_handler(move || {
            stop_signal.store(true, Ordering::SeqCst);
        })
        .context("Failed to set Ctrl+C handler")?;
        spawn_stdin_watcher(stop.clone())?;

        tracker.start()?;
        println!("Tracking started. Type 'quit' to stop.");

        wait_for_stop(&tracker, &stop, self.duration);

        tracker.stop()?;
        print_summary(&tracker);
        Ok(())
    }
}

/// 读取标准输入，收到 `quit` 时置位停止标志
///
/// 标准输入关闭（EOF）时线程退出，但不会停止追踪。
fn spawn_stdin_watcher(stop: Arc<AtomicBool>) -> Result<()> {
    thread::Builder::new()
        .name("leap-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) if line.trim() == "quit" => {
                        stop.store(true, Ordering::SeqCst);
                        break;
                    },
                    Ok(_) => {},
                    Err(_) => break,
                }
            }
        })
        .context("Failed to spawn stdin watcher")?;
    Ok(())
}

fn wait_for_stop(tracker: &Tracker, stop: &AtomicBool, duration_secs: u64) {
    let deadline = (duration_secs > 0).then(|| Instant::now() + Duration::from_secs(duration_secs));

    while !stop.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Tracking duration of {duration_secs}s elapsed");
            break;
        }
        if tracker.state() == TrackerState::Closed {
            warn!("Tracking loop exited before stop was requested");
            break;
        }
        thread::sleep(WAIT_TICK);
    }
}

fn print_summary(tracker: &Tracker) {
    let snapshot = tracker.metrics().snapshot();
    println!("Tracking stopped.");
    println!("  Session:         {}", tracker.session().session_number);
    println!("  Frames:          {}", snapshot.tracking_frames);
    println!("  Hands:           {}", snapshot.hands_processed);
    println!("  Log rows:        {}", snapshot.log_rows);
    println!("  OSC messages:    {}", snapshot.osc_messages);
    println!("  Push broadcasts: {}", snapshot.push_broadcasts);
    println!(
        "  Errors:          poll {}, sinks {}",
        snapshot.poll_errors,
        snapshot.sink_errors()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: TrackCommand,
    }

    fn parse(args: &[&str]) -> TrackCommand {
        TestCli::parse_from(std::iter::once("leap-tracker").chain(args.iter().copied())).args
    }

    #[test]
    fn test_positional_arguments() {
        let command = parse(&["Alice", "3", "make_a_fist", "10.0.0.2", "9100", "8100"]);
        let config = command.resolve_config().unwrap();
        assert_eq!(config.session.client_name, "Alice");
        assert_eq!(config.session.session_number, 3);
        assert_eq!(config.session.exercise_name, "make_a_fist");
        assert_eq!(config.realtime.host, "10.0.0.2");
        assert_eq!(config.realtime.port, 9100);
        assert_eq!(config.push.port, 8100);
        assert!(config.push.enabled);
    }

    #[test]
    fn test_arguments_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.toml");
        std::fs::write(
            &path,
            "[session]\nclient_name = \"Bob\"\nexercise_name = \"curl\"\n\n\
             [realtime]\nport = 9500\n",
        )
        .unwrap();

        let command = parse(&[
            "--config",
            path.to_str().unwrap(),
            "Alice",
            "--no-push",
            "--output-dir",
            "logs",
        ]);
        let config = command.resolve_config().unwrap();
        assert_eq!(config.session.client_name, "Alice");
        assert_eq!(config.session.exercise_name, "curl");
        assert_eq!(config.realtime.port, 9500);
        assert!(!config.push.enabled);
        assert_eq!(config.output.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_missing_config_file() {
        let command = parse(&["--config", "/definitely/not/here.toml"]);
        assert!(command.resolve_config().is_err());
    }

    #[test]
    fn test_synthetic_sides() {
        assert_eq!(parse(&[]).synthetic_config().sides, [HandSide::Right]);
        assert_eq!(
            parse(&["--both-hands"]).synthetic_config().sides,
            [HandSide::Left, HandSide::Right]
        );
    }
}
