//! Mock 连接（脚本化事件序列）
//!
//! 测试通过 [`MockHandle`] 在连接被移动到轮询线程后继续注入事件、
//! 读取调用计数。

use crate::{DeviceError, DeviceEvent, DeviceFault, PolicyFlags, TrackingConnection};
use leap_protocol::Frame;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// 脚本为空时单次轮询的最长等待
const IDLE_POLL_DELAY: Duration = Duration::from_millis(2);

enum Step {
    Event(DeviceEvent),
    Error(DeviceError),
}

#[derive(Default)]
struct MockState {
    script: VecDeque<Step>,
    open_error: Option<DeviceFault>,
    policy_failures: u32,
    policy_calls: Vec<(PolicyFlags, PolicyFlags)>,
    open_count: u32,
    close_count: u32,
    poll_count: u64,
}

/// Mock 连接的共享控制句柄
#[derive(Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 追加一个事件
    pub fn push_event(&self, event: DeviceEvent) {
        self.lock().script.push_back(Step::Event(event));
    }

    /// 追加一个追踪帧
    pub fn push_frame(&self, frame: Frame) {
        self.push_event(DeviceEvent::Tracking(frame));
    }

    /// 追加一次轮询失败
    pub fn push_error(&self, error: DeviceError) {
        self.lock().script.push_back(Step::Error(error));
    }

    /// 令下一次 `open()` 失败
    pub fn fail_open(&self, fault: DeviceFault) {
        self.lock().open_error = Some(fault);
    }

    /// 令接下来 `count` 次 `set_policy()` 失败
    pub fn fail_policy(&self, count: u32) {
        self.lock().policy_failures = count;
    }

    /// 脚本是否已全部消费
    pub fn is_drained(&self) -> bool {
        self.lock().script.is_empty()
    }

    pub fn open_count(&self) -> u32 {
        self.lock().open_count
    }

    pub fn close_count(&self) -> u32 {
        self.lock().close_count
    }

    pub fn poll_count(&self) -> u64 {
        self.lock().poll_count
    }

    /// 全部 `set_policy()` 调用（含失败的调用）
    pub fn policy_calls(&self) -> Vec<(PolicyFlags, PolicyFlags)> {
        self.lock().policy_calls.clone()
    }
}

/// 脚本化 Mock 连接
pub struct MockConnection {
    handle: MockHandle,
    opened: bool,
}

impl MockConnection {
    /// 创建连接和对应的控制句柄
    pub fn new() -> (Self, MockHandle) {
        let handle = MockHandle::default();
        (
            Self {
                handle: handle.clone(),
                opened: false,
            },
            handle,
        )
    }
}

impl TrackingConnection for MockConnection {
    fn open(&mut self) -> Result<(), DeviceError> {
        let mut state = self.handle.lock();
        state.open_count += 1;
        if let Some(fault) = state.open_error.take() {
            return Err(DeviceError::Device(fault));
        }
        self.opened = true;
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Result<DeviceEvent, DeviceError> {
        if !self.opened {
            return Err(DeviceError::NotOpen);
        }

        let step = {
            let mut state = self.handle.lock();
            state.poll_count += 1;
            state.script.pop_front()
        };

        match step {
            Some(Step::Event(event)) => Ok(event),
            Some(Step::Error(error)) => Err(error),
            None => {
                std::thread::sleep(timeout.min(IDLE_POLL_DELAY));
                Err(DeviceError::Timeout)
            },
        }
    }

    fn set_policy(&mut self, set: PolicyFlags, clear: PolicyFlags) -> Result<(), DeviceError> {
        let mut state = self.handle.lock();
        state.policy_calls.push((set, clear));
        if state.policy_failures > 0 {
            state.policy_failures -= 1;
            return Err(DeviceError::Device(DeviceFault::new(
                crate::DeviceFaultKind::UnsupportedPolicy,
                "mock policy failure",
            )));
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.opened {
            self.opened = false;
            self.handle.lock().close_count += 1;
        }
    }

    fn describe(&self) -> String {
        "mock connection".to_string()
    }
}
