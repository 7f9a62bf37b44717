//! 运行计数器
//!
//! 所有计数器都使用原子操作，可以在任何线程读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 追踪循环与输出通道的实时计数器
///
/// # 使用示例
///
/// ```rust
/// use leap_driver::TrackerMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(TrackerMetrics::default());
///
/// // 在轮询线程中更新
/// metrics.tracking_frames.fetch_add(1, Ordering::Relaxed);
///
/// // 在主线程中读取快照
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.tracking_frames, 1);
/// ```
#[derive(Debug, Default)]
pub struct TrackerMetrics {
    /// 轮询次数（含超时与失败）
    pub polls_total: AtomicU64,
    /// 轮询超时次数（无事件，正常现象）
    pub poll_timeouts: AtomicU64,
    /// 轮询失败次数（超时除外）
    pub poll_errors: AtomicU64,
    /// 连接建立事件数
    pub connection_events: AtomicU64,
    /// 追踪帧数
    pub tracking_frames: AtomicU64,
    /// 已处理的手（记录）数
    pub hands_processed: AtomicU64,

    // === 输出通道 ===
    /// 写入的日志行数
    pub log_rows: AtomicU64,
    pub log_errors: AtomicU64,
    /// 成功发送的实时消息数
    pub osc_messages: AtomicU64,
    pub osc_errors: AtomicU64,
    /// 推送广播次数（每帧一次）
    pub push_broadcasts: AtomicU64,
    pub push_errors: AtomicU64,
}

impl TrackerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self) -> [&AtomicU64; 12] {
        [
            &self.polls_total,
            &self.poll_timeouts,
            &self.poll_errors,
            &self.connection_events,
            &self.tracking_frames,
            &self.hands_processed,
            &self.log_rows,
            &self.log_errors,
            &self.osc_messages,
            &self.osc_errors,
            &self.push_broadcasts,
            &self.push_errors,
        ]
    }

    /// 读取所有计数器的快照
    ///
    /// 使用 `Ordering::Relaxed`，不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls_total: self.polls_total.load(Ordering::Relaxed),
            poll_timeouts: self.poll_timeouts.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
            connection_events: self.connection_events.load(Ordering::Relaxed),
            tracking_frames: self.tracking_frames.load(Ordering::Relaxed),
            hands_processed: self.hands_processed.load(Ordering::Relaxed),
            log_rows: self.log_rows.load(Ordering::Relaxed),
            log_errors: self.log_errors.load(Ordering::Relaxed),
            osc_messages: self.osc_messages.load(Ordering::Relaxed),
            osc_errors: self.osc_errors.load(Ordering::Relaxed),
            push_broadcasts: self.push_broadcasts.load(Ordering::Relaxed),
            push_errors: self.push_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        for counter in self.counters() {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 计数器快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub polls_total: u64,
    pub poll_timeouts: u64,
    pub poll_errors: u64,
    pub connection_events: u64,
    pub tracking_frames: u64,
    pub hands_processed: u64,
    pub log_rows: u64,
    pub log_errors: u64,
    pub osc_messages: u64,
    pub osc_errors: u64,
    pub push_broadcasts: u64,
    pub push_errors: u64,
}

impl MetricsSnapshot {
    /// 输出通道错误总数
    pub fn sink_errors(&self) -> u64 {
        self.log_errors + self.osc_errors + self.push_errors
    }

    /// 轮询失败率（百分比，超时不计入失败）
    ///
    /// `polls_total` 为 0 时返回 0.0。
    pub fn poll_error_rate(&self) -> f64 {
        if self.polls_total == 0 {
            return 0.0;
        }
        (self.poll_errors as f64 / self.polls_total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = TrackerMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.poll_error_rate(), 0.0);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = TrackerMetrics::new();
        metrics.polls_total.fetch_add(10, Ordering::Relaxed);
        metrics.poll_errors.fetch_add(2, Ordering::Relaxed);
        metrics.push_errors.fetch_add(1, Ordering::Relaxed);
        metrics.osc_errors.fetch_add(4, Ordering::Relaxed);

        let before = metrics.snapshot();
        assert_eq!(before.sink_errors(), 5);
        assert!((before.poll_error_rate() - 20.0).abs() < 1e-9);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_concurrent_updates() {
        let metrics = Arc::new(TrackerMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.tracking_frames.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().tracking_frames, 4000);
    }
}
