//! 追踪器配置（TOML）
//!
//! 所有字段均有默认值，配置文件只需写出需要覆盖的部分：
//!
//! ```toml
//! [session]
//! client_name = "Alice"
//! session_number = 1
//! exercise_name = "make_a_fist"
//!
//! [realtime]
//! host = "192.168.1.20"
//! port = 9000
//!
//! [metrics]
//! max_flexion_degrees = 650.0
//! ```

use crate::error::DriverError;
use leap_kinematics::{MetricConfig, SessionContext};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认实时消息端口
pub const DEFAULT_REALTIME_PORT: u16 = 9000;
/// 默认推送端口（浏览器客户端连接 `ws://localhost:8080`）
pub const DEFAULT_PUSH_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub client_name: String,
    pub session_number: u32,
    pub exercise_name: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            client_name: String::new(),
            session_number: 1,
            exercise_name: String::new(),
        }
    }
}

impl SessionSection {
    pub fn to_context(&self) -> SessionContext {
        SessionContext::new(
            self.client_name.clone(),
            self.session_number,
            self.exercise_name.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// 日志文件所在目录
    pub log_dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("."),
        }
    }
}

/// 实时消息（UDP）目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSection {
    pub host: String,
    pub port: u16,
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_REALTIME_PORT,
        }
    }
}

/// 推送服务（WebSocket）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushSection {
    pub enabled: bool,
    pub port: u16,
    /// 每个客户端的待发送队列长度，队列满时该客户端跳过当前帧
    pub client_queue_capacity: usize,
}

impl Default for PushSection {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_PUSH_PORT,
            client_queue_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    /// 单次轮询最长等待（毫秒）
    pub poll_timeout_ms: u64,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 1000,
        }
    }
}

impl DeviceSection {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// 追踪器完整配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub session: SessionSection,
    pub output: OutputSection,
    pub realtime: RealtimeSection,
    pub push: PushSection,
    pub device: DeviceSection,
    pub metrics: MetricConfig,
}

impl TrackerConfig {
    /// 从 TOML 文本解析
    pub fn from_toml_str(text: &str) -> Result<Self, DriverError> {
        let config: Self = toml::from_str(text).map_err(|e| DriverError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, DriverError> {
        toml::to_string_pretty(self).map_err(|e| DriverError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        self.metrics.validate()?;
        if self.push.client_queue_capacity == 0 {
            return Err(DriverError::Config(
                "push.client_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.device.poll_timeout_ms == 0 {
            return Err(DriverError::Config(
                "device.poll_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.session.session_number, 1);
        assert_eq!(config.output.log_dir, PathBuf::from("."));
        assert_eq!(config.realtime.port, DEFAULT_REALTIME_PORT);
        assert_eq!(config.push.port, DEFAULT_PUSH_PORT);
        assert_eq!(config.push.client_queue_capacity, 64);
        assert_eq!(config.device.poll_timeout(), Duration::from_secs(1));
        assert_eq!(config.metrics, MetricConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = TrackerConfig::from_toml_str(
            r#"
            [session]
            client_name = "Alice"
            exercise_name = "curl"

            [realtime]
            host = "10.0.0.5"

            [metrics]
            max_flexion_degrees = 650.0
            "#,
        )
        .unwrap();

        let session = config.session.to_context();
        assert_eq!(session, SessionContext::new("Alice", 1, "curl"));
        assert_eq!(config.realtime.host, "10.0.0.5");
        assert_eq!(config.realtime.port, DEFAULT_REALTIME_PORT);
        assert_eq!(config.metrics.max_flexion_degrees, 650.0);
        assert_eq!(config.metrics.min_flexion_degrees, 50.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            TrackerConfig::from_toml_str("[push]\nclient_queue_capacity = 0"),
            Err(DriverError::Config(_))
        ));
        assert!(matches!(
            TrackerConfig::from_toml_str("[metrics]\nmin_flexion_degrees = 800.0"),
            Err(DriverError::Metrics(_))
        ));
        assert!(matches!(
            TrackerConfig::from_toml_str("[device]\npoll_timeout_ms = \"soon\""),
            Err(DriverError::Config(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = TrackerConfig::default();
        config.session.client_name = "Bob".into();
        config.push.enabled = false;
        let text = config.to_toml_string().unwrap();
        assert_eq!(TrackerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = TrackerConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("here.toml"));
    }
}
