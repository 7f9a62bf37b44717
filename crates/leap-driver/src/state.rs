//! 追踪器生命周期状态
//!
//! ```text
//! Idle --start()--> Connecting --open ok--> Polling --stop()--> Closed
//!                       |
//!                       +--open failed--> Closed
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

/// 追踪器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TrackerState {
    /// 已构造，尚未启动
    #[default]
    Idle = 0,
    /// 轮询线程已启动，正在打开设备连接
    Connecting = 1,
    /// 正在轮询
    Polling = 2,
    /// 已停止（或连接打开失败），不可再启动
    Closed = 3,
}

impl TrackerState {
    /// 从 u8 转换
    ///
    /// 无效值视为 Closed。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Polling,
            _ => Self::Closed,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 轮询线程是否处于活动阶段
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Polling)
    }
}

/// 追踪器状态（原子版本，用于线程间共享）
#[derive(Debug)]
pub struct AtomicTrackerState {
    inner: AtomicU8,
}

impl AtomicTrackerState {
    pub fn new(state: TrackerState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> TrackerState {
        TrackerState::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, state: TrackerState, ordering: Ordering) {
        self.inner.store(state.as_u8(), ordering);
    }

    /// 比较并交换
    ///
    /// 失败时返回实际的当前状态。
    pub fn compare_exchange(
        &self,
        current: TrackerState,
        new: TrackerState,
        success: Ordering,
        failure: Ordering,
    ) -> Result<TrackerState, TrackerState> {
        self.inner
            .compare_exchange(current.as_u8(), new.as_u8(), success, failure)
            .map(TrackerState::from_u8)
            .map_err(TrackerState::from_u8)
    }
}

impl Default for AtomicTrackerState {
    fn default() -> Self {
        Self::new(TrackerState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_conversions() {
        for state in [
            TrackerState::Idle,
            TrackerState::Connecting,
            TrackerState::Polling,
            TrackerState::Closed,
        ] {
            assert_eq!(TrackerState::from_u8(state.as_u8()), state);
        }
        assert_eq!(TrackerState::from_u8(200), TrackerState::Closed);
        assert!(TrackerState::Polling.is_active());
        assert!(!TrackerState::Idle.is_active());
    }

    #[test]
    fn test_atomic_state_compare_exchange() {
        let state = AtomicTrackerState::default();
        assert_eq!(state.get(Ordering::Relaxed), TrackerState::Idle);

        assert_eq!(
            state.compare_exchange(
                TrackerState::Idle,
                TrackerState::Connecting,
                Ordering::AcqRel,
                Ordering::Acquire
            ),
            Ok(TrackerState::Idle)
        );
        assert_eq!(
            state.compare_exchange(
                TrackerState::Idle,
                TrackerState::Connecting,
                Ordering::AcqRel,
                Ordering::Acquire
            ),
            Err(TrackerState::Connecting)
        );

        state.set(TrackerState::Closed, Ordering::Release);
        assert_eq!(state.get(Ordering::Acquire), TrackerState::Closed);
    }
}
