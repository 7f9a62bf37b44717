//! 追踪器生命周期
//!
//! [`Tracker`] 持有轮询线程与推送服务。`start()` 只能调用一次，
//! `stop()` 幂等，`Drop` 时自动停止。

use crate::error::DriverError;
use crate::fanout::FrameProcessor;
use crate::metrics::TrackerMetrics;
use crate::pipeline::{LoopContext, PollConfig, poll_loop};
use crate::push::PushServer;
use crate::state::{AtomicTrackerState, TrackerState};
use arc_swap::ArcSwap;
use leap_device::TrackingConnection;
use leap_kinematics::SessionContext;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

/// 尚未启动的轮询循环（启动时整体移入轮询线程）
pub(crate) struct PendingLoop {
    pub(crate) connection: Box<dyn TrackingConnection + Send>,
    pub(crate) processor: FrameProcessor,
    pub(crate) config: PollConfig,
}

/// 手部追踪器
///
/// 通过 [`TrackerBuilder`](crate::TrackerBuilder) 构造。
pub struct Tracker {
    state: Arc<AtomicTrackerState>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<TrackerMetrics>,
    latest: Arc<ArcSwap<String>>,
    session: SessionContext,
    log_path: PathBuf,
    push: Option<Arc<PushServer>>,
    pending: Option<PendingLoop>,
    poll_thread: Option<JoinHandle<()>>,
}

impl Tracker {
    pub(crate) fn new(
        pending: PendingLoop,
        session: SessionContext,
        log_path: PathBuf,
        push: Option<Arc<PushServer>>,
        metrics: Arc<TrackerMetrics>,
    ) -> Self {
        Self {
            state: Arc::new(AtomicTrackerState::new(TrackerState::Idle)),
            is_running: Arc::new(AtomicBool::new(false)),
            metrics,
            latest: Arc::new(ArcSwap::from_pointee(String::new())),
            session,
            log_path,
            push,
            pending: Some(pending),
            poll_thread: None,
        }
    }

    /// 启动轮询线程
    ///
    /// # 错误
    /// - `DriverError::InvalidState`: 已启动或已停止
    /// - `DriverError::ThreadSpawn`: 线程创建失败
    pub fn start(&mut self) -> Result<(), DriverError> {
        self.state
            .compare_exchange(
                TrackerState::Idle,
                TrackerState::Connecting,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(DriverError::InvalidState)?;

        let Some(PendingLoop {
            mut connection,
            mut processor,
            config,
        }) = self.pending.take()
        else {
            self.state.set(TrackerState::Closed, Ordering::Release);
            return Err(DriverError::InvalidState(TrackerState::Closed));
        };

        self.is_running.store(true, Ordering::Release);
        let state = self.state.clone();
        let is_running = self.is_running.clone();
        let metrics = self.metrics.clone();

        let spawned = thread::Builder::new().name("leap-poll".into()).spawn(move || {
            let ctx = LoopContext {
                state: &state,
                is_running: &is_running,
                metrics: &metrics,
            };
            poll_loop(connection.as_mut(), &mut processor, &ctx, &config);
        });

        match spawned {
            Ok(handle) => {
                self.poll_thread = Some(handle);
                info!("Tracker started for session {}", self.session.session_number);
                Ok(())
            },
            Err(e) => {
                self.is_running.store(false, Ordering::Release);
                self.state.set(TrackerState::Closed, Ordering::Release);
                Err(DriverError::ThreadSpawn(e))
            },
        }
    }

    /// 停止轮询并关闭推送服务（幂等）
    ///
    /// 当前帧处理完毕后才会生效，最长等待一个轮询超时。
    ///
    /// # 错误
    /// - `DriverError::ThreadJoin`: 轮询线程 panic
    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.is_running.store(false, Ordering::Release);

        let joined = match self.poll_thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| DriverError::ThreadJoin("poll thread panicked".to_string())),
            None => Ok(()),
        };

        if let Some(push) = &self.push {
            push.shutdown();
        }
        // 从未启动的连接随 PendingLoop 一起释放
        self.pending = None;

        let previous = self.state.get(Ordering::Acquire);
        self.state.set(TrackerState::Closed, Ordering::Release);
        if previous != TrackerState::Closed {
            info!("Tracker stopped");
        }
        joined
    }

    pub fn state(&self) -> TrackerState {
        self.state.get(Ordering::Acquire)
    }

    pub fn metrics(&self) -> &Arc<TrackerMetrics> {
        &self.metrics
    }

    /// 最近一次缓存的摘要文本
    ///
    /// 预留接口：轮询循环目前不写入，始终为空字符串。
    pub fn latest_data(&self) -> Arc<String> {
        self.latest.load_full()
    }

    /// 会话上下文（会话号为日志文件实际使用的编号）
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// 推送服务监听地址（未启用时为 None）
    pub fn push_addr(&self) -> Option<SocketAddr> {
        self.push.as_ref().map(|push| push.local_addr())
    }

    pub fn push_client_count(&self) -> usize {
        self.push.as_ref().map_or(0, |push| push.client_count())
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop tracker: {}", e);
        }
    }
}
