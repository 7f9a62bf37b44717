//! 轮询循环
//!
//! 单线程状态机：打开连接 → 轮询 → 处理事件 → 关闭连接。
//! 停止请求只在两次轮询之间生效，单帧的记录构建与分发不会被打断。

use crate::fanout::FrameProcessor;
use crate::metrics::TrackerMetrics;
use crate::state::{AtomicTrackerState, TrackerState};
use leap_device::{DeviceEvent, PolicyFlags, TrackingConnection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 轮询配置
///
/// # Example
///
/// ```
/// use leap_driver::PollConfig;
/// use std::time::Duration;
///
/// let config = PollConfig::default();
/// assert_eq!(config.poll_timeout, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// 单次轮询最长等待
    pub poll_timeout: Duration,
    /// 连接建立后请求的设备策略
    pub policy: PolicyFlags,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(1000),
            policy: PolicyFlags::IMAGES | PolicyFlags::MAP_POINTS,
        }
    }
}

/// 轮询线程共享的控制信息
pub struct LoopContext<'a> {
    pub state: &'a AtomicTrackerState,
    pub is_running: &'a AtomicBool,
    pub metrics: &'a TrackerMetrics,
}

/// 轮询循环
///
/// # 参数
/// - `connection`: 设备连接（在循环中独占）
/// - `processor`: 逐帧处理器
/// - `ctx`: 状态、运行标志与计数器
/// - `config`: 轮询配置
///
/// 连接打开失败时记录错误、状态置为 `Closed` 并直接返回。
/// 轮询失败（超时除外）只记录，循环继续。
pub fn poll_loop<C: TrackingConnection + ?Sized>(
    connection: &mut C,
    processor: &mut FrameProcessor,
    ctx: &LoopContext<'_>,
    config: &PollConfig,
) {
    ctx.state.set(TrackerState::Connecting, Ordering::Release);
    if let Err(e) = connection.open() {
        error!("Failed to open {}: {}", connection.describe(), e);
        ctx.state.set(TrackerState::Closed, Ordering::Release);
        return;
    }
    info!("Opened {}", connection.describe());

    // 停止请求可能发生在打开期间
    if ctx
        .state
        .compare_exchange(
            TrackerState::Connecting,
            TrackerState::Polling,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
        .is_err()
    {
        debug!("Stop requested while connecting");
    }

    let mut policy_applied = false;

    while ctx.is_running.load(Ordering::Acquire) {
        let event = connection.poll(config.poll_timeout);
        ctx.metrics.polls_total.fetch_add(1, Ordering::Relaxed);

        match event {
            Ok(DeviceEvent::Connection) => {
                ctx.metrics.connection_events.fetch_add(1, Ordering::Relaxed);
                info!("Tracking service connected");
                if !policy_applied {
                    match connection.set_policy(config.policy, PolicyFlags::NONE) {
                        Ok(()) => {
                            policy_applied = true;
                            debug!("Requested policy {:#x}", config.policy.bits());
                        },
                        Err(e) => warn!("Failed to set device policy (will retry): {}", e),
                    }
                }
            },
            Ok(DeviceEvent::ConnectionLost) => {
                warn!("Tracking service connection lost");
            },
            Ok(DeviceEvent::Tracking(frame)) => {
                processor.process(&frame);
            },
            Ok(DeviceEvent::Other(kind)) => {
                trace!("Ignoring device event: {}", kind);
            },
            Err(e) if e.is_timeout() => {
                ctx.metrics.poll_timeouts.fetch_add(1, Ordering::Relaxed);
                trace!("Poll timeout");
            },
            Err(e) => {
                ctx.metrics.poll_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Poll failed: {}", e);
            },
        }
    }

    processor.flush();
    connection.close();
    ctx.state.set(TrackerState::Closed, Ordering::Release);
    info!("Polling stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::SinkFanout;
    use leap_device::{DeviceError, DeviceFault, DeviceFaultKind, MockConnection};
    use leap_kinematics::{FrameRecordBuilder, SessionContext};
    use leap_protocol::Frame;
    use std::sync::Arc;
    use std::thread;

    fn processor(metrics: &Arc<TrackerMetrics>) -> FrameProcessor {
        FrameProcessor::new(
            SessionContext::new("Alice", 1, "curl"),
            FrameRecordBuilder::default(),
            SinkFanout::new(metrics.clone()),
            metrics.clone(),
        )
    }

    fn config() -> PollConfig {
        PollConfig {
            poll_timeout: Duration::from_millis(5),
            ..PollConfig::default()
        }
    }

    /// 等待脚本播放完毕后停止循环
    fn run_until_drained(
        mut connection: MockConnection,
        handle: &leap_device::MockHandle,
    ) -> (Arc<TrackerMetrics>, TrackerState) {
        let metrics = Arc::new(TrackerMetrics::new());
        let state = AtomicTrackerState::default();
        let is_running = AtomicBool::new(true);
        let mut processor = processor(&metrics);

        thread::scope(|scope| {
            scope.spawn(|| {
                let ctx = LoopContext {
                    state: &state,
                    is_running: &is_running,
                    metrics: &metrics,
                };
                poll_loop(&mut connection, &mut processor, &ctx, &config());
            });
            while !handle.is_drained() && state.get(Ordering::Acquire) != TrackerState::Closed {
                thread::sleep(Duration::from_millis(2));
            }
            thread::sleep(Duration::from_millis(20));
            is_running.store(false, Ordering::Release);
        });
        (metrics, state.get(Ordering::Acquire))
    }

    #[test]
    fn test_open_failure_exits_loop() {
        let (connection, handle) = MockConnection::new();
        handle.fail_open(DeviceFault::new(DeviceFaultKind::ServiceUnavailable, "no service"));
        handle.push_frame(Frame::empty(1));

        let (metrics, state) = run_until_drained(connection, &handle);
        assert_eq!(state, TrackerState::Closed);
        assert_eq!(metrics.snapshot().polls_total, 0);
        assert_eq!(handle.poll_count(), 0);
    }

    #[test]
    fn test_poll_errors_do_not_stop_loop() {
        let (connection, handle) = MockConnection::new();
        handle.push_event(DeviceEvent::Connection);
        handle.push_error(DeviceError::Device(DeviceFault::from("glitch")));
        handle.push_frame(Frame::empty(1));
        handle.push_error(DeviceError::Device(DeviceFault::from("glitch")));
        handle.push_frame(Frame::empty(2));

        let (metrics, state) = run_until_drained(connection, &handle);
        let snapshot = metrics.snapshot();
        assert_eq!(state, TrackerState::Closed);
        assert_eq!(snapshot.poll_errors, 2);
        assert_eq!(snapshot.tracking_frames, 2);
        assert_eq!(snapshot.connection_events, 1);
        assert_eq!(handle.close_count(), 1);
    }

    #[test]
    fn test_policy_requested_once_and_retried_on_failure() {
        let (connection, handle) = MockConnection::new();
        handle.fail_policy(1);
        handle.push_event(DeviceEvent::Connection);
        handle.push_event(DeviceEvent::Connection);
        handle.push_event(DeviceEvent::Connection);

        run_until_drained(connection, &handle);
        let calls = handle.policy_calls();
        // 第一次失败，第二次成功，第三次不再请求
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, PolicyFlags::IMAGES | PolicyFlags::MAP_POINTS);
    }

    #[test]
    fn test_default_config() {
        let config = PollConfig::default();
        assert_eq!(config.poll_timeout, Duration::from_millis(1000));
        assert!(config.policy.contains(PolicyFlags::MAP_POINTS));
    }
}
