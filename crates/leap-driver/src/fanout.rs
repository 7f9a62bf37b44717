//! 逐帧处理与多通道分发
//!
//! [`FrameProcessor`] 为帧中每只手构建记录，再交给 [`SinkFanout`]
//! 依次分发到各通道。任何通道失败只记录和计数，其余通道照常执行，
//! 错误不会离开本模块。

use crate::metrics::TrackerMetrics;
use crate::sinks::{FrameBatch, FrameSink, SinkKind};
use leap_kinematics::{FrameRecord, FrameRecordBuilder, SessionContext};
use leap_protocol::Frame;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

/// 记录时间戳格式（本地时间）
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 当前本地时间戳
pub fn local_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// 单帧分发结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FanoutReport {
    pub succeeded: usize,
    pub failed: usize,
}

fn error_counter(metrics: &TrackerMetrics, kind: SinkKind) -> &AtomicU64 {
    match kind {
        SinkKind::Log => &metrics.log_errors,
        SinkKind::Osc => &metrics.osc_errors,
        SinkKind::Push => &metrics.push_errors,
    }
}

/// 多通道分发器
pub struct SinkFanout {
    sinks: Vec<Box<dyn FrameSink>>,
    metrics: Arc<TrackerMetrics>,
}

impl SinkFanout {
    pub fn new(metrics: Arc<TrackerMetrics>) -> Self {
        Self {
            sinks: Vec::new(),
            metrics,
        }
    }

    /// 追加通道（按追加顺序分发）
    pub fn push(&mut self, sink: Box<dyn FrameSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn kinds(&self) -> Vec<SinkKind> {
        self.sinks.iter().map(|sink| sink.kind()).collect()
    }

    /// 把一帧分发到所有通道
    pub fn dispatch(&mut self, batch: &FrameBatch<'_>) -> FanoutReport {
        let mut report = FanoutReport::default();
        for sink in &mut self.sinks {
            let kind = sink.kind();
            match sink.dispatch(batch) {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    warn!("{} sink failed: {}", kind.as_str(), e);
                    error_counter(&self.metrics, kind).fetch_add(1, Ordering::Relaxed);
                    report.failed += 1;
                },
            }
        }
        report
    }

    /// 刷新所有通道（停止时调用）
    pub fn flush(&mut self) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                warn!("Failed to flush {} sink: {}", sink.kind().as_str(), e);
            }
        }
    }
}

/// 逐帧处理器（轮询线程独占）
pub struct FrameProcessor {
    session: SessionContext,
    builder: FrameRecordBuilder,
    fanout: SinkFanout,
    metrics: Arc<TrackerMetrics>,
}

impl FrameProcessor {
    pub fn new(
        session: SessionContext,
        builder: FrameRecordBuilder,
        fanout: SinkFanout,
        metrics: Arc<TrackerMetrics>,
    ) -> Self {
        Self {
            session,
            builder,
            fanout,
            metrics,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn fanout(&self) -> &SinkFanout {
        &self.fanout
    }

    /// 处理一帧（时间戳取当前本地时间）
    pub fn process(&mut self, frame: &Frame) -> FanoutReport {
        let timestamp = local_timestamp();
        self.process_at(frame, &timestamp)
    }

    /// 用给定时间戳处理一帧
    ///
    /// 帧中没有手时仍然分发：实时通道发送存在标志 0，推送通道广播
    /// `handPresent=false`，日志不写行。
    pub fn process_at(&mut self, frame: &Frame, timestamp: &str) -> FanoutReport {
        let records: Vec<FrameRecord> = self.builder.build_all(&self.session, frame, timestamp);

        self.metrics.tracking_frames.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .hands_processed
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        trace!("Frame {}: {} hand(s)", frame.id, records.len());

        self.fanout.dispatch(&FrameBatch {
            timestamp,
            hand_present: frame.has_hands(),
            records: &records,
        })
    }

    pub fn flush(&mut self) {
        self.fanout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use leap_protocol::HandSide;
    use parking_lot::Mutex;

    /// 记录收到的批次
    struct Recorder {
        kind: SinkKind,
        seen: Arc<Mutex<Vec<(String, bool, usize)>>>,
    }

    impl FrameSink for Recorder {
        fn kind(&self) -> SinkKind {
            self.kind
        }

        fn dispatch(&mut self, batch: &FrameBatch<'_>) -> Result<(), SinkError> {
            self.seen.lock().push((
                batch.timestamp.to_string(),
                batch.hand_present,
                batch.records.len(),
            ));
            Ok(())
        }
    }

    struct Failing(SinkKind);

    impl FrameSink for Failing {
        fn kind(&self) -> SinkKind {
            self.0
        }

        fn dispatch(&mut self, _batch: &FrameBatch<'_>) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk full")))
        }

        fn flush(&mut self) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk full")))
        }
    }

    fn processor(sinks: Vec<Box<dyn FrameSink>>) -> (FrameProcessor, Arc<TrackerMetrics>) {
        let metrics = Arc::new(TrackerMetrics::new());
        let mut fanout = SinkFanout::new(metrics.clone());
        for sink in sinks {
            fanout.push(sink);
        }
        let processor = FrameProcessor::new(
            SessionContext::new("Alice", 1, "curl"),
            FrameRecordBuilder::default(),
            fanout,
            metrics.clone(),
        );
        (processor, metrics)
    }

    #[test]
    fn test_failure_does_not_stop_other_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (mut processor, metrics) = processor(vec![
            Box::new(Failing(SinkKind::Osc)),
            Box::new(Recorder {
                kind: SinkKind::Log,
                seen: seen.clone(),
            }),
            Box::new(Failing(SinkKind::Push)),
        ]);
        assert_eq!(
            processor.fanout().kinds(),
            [SinkKind::Osc, SinkKind::Log, SinkKind::Push]
        );

        let hand = leap_device::synthetic_hand(HandSide::Right, 0.5, 0.0, 0.0);
        let report = processor.process_at(&Frame::new(1, vec![hand]), "2026-01-01 00:00:00");
        assert_eq!(
            report,
            FanoutReport {
                succeeded: 1,
                failed: 2
            }
        );
        assert_eq!(
            seen.lock().as_slice(),
            [("2026-01-01 00:00:00".to_string(), true, 1)]
        );

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.osc_errors, 1);
        assert_eq!(snapshot.push_errors, 1);
        assert_eq!(snapshot.log_errors, 0);
        assert_eq!(snapshot.tracking_frames, 1);
        assert_eq!(snapshot.hands_processed, 1);

        // 刷新失败同样只记录
        processor.flush();
    }

    #[test]
    fn test_empty_frame_is_still_dispatched() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (mut processor, metrics) = processor(vec![Box::new(Recorder {
            kind: SinkKind::Push,
            seen: seen.clone(),
        })]);

        processor.process(&Frame::empty(9));
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].1);
        assert_eq!(seen[0].2, 0);
        assert_eq!(seen[0].0.len(), "2026-01-01 00:00:00".len());
        assert_eq!(metrics.snapshot().hands_processed, 0);
    }

    #[test]
    fn test_two_hands_share_timestamp() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (mut processor, metrics) = processor(vec![Box::new(Recorder {
            kind: SinkKind::Log,
            seen: seen.clone(),
        })]);
        let hands = vec![
            leap_device::synthetic_hand(HandSide::Left, 0.2, 0.0, 0.0),
            leap_device::synthetic_hand(HandSide::Right, 0.8, 0.0, 0.0),
        ];
        processor.process_at(&Frame::new(3, hands), "t");
        assert_eq!(seen.lock()[0], ("t".to_string(), true, 2));
        assert_eq!(metrics.snapshot().hands_processed, 2);
    }
}
