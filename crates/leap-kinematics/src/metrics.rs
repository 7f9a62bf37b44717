//! 康复训练指标
//!
//! 三个指标均归一化到 `[0, 1]`：
//!
//! | 指标 | 0 | 1 |
//! |------|---|---|
//! | 握拳 (grip closure) | 完全张开 | 完全握拳 |
//! | 前臂旋转 (forearm rotation) | 完全旋前 | 完全旋后 |
//! | 腕主动活动度 (wrist ROM) | 最大下屈 | 最大上伸 |

use crate::math::{angle_between_bones, to_na};
use leap_protocol::Hand;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};
use thiserror::Error;

/// 退化向量判定阈值
const DEGENERATE_MAGNITUDE: f32 = 1e-6;

/// 指标参数错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricConfigError {
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },
    #[error("max_flexion_degrees ({max}) must be greater than min_flexion_degrees ({min})")]
    InvertedFlexionRange { min: f32, max: f32 },
    #[error("wrist_rom_neutral must be within [0, 1], got {0}")]
    NeutralOutOfRange(f32),
}

/// 指标标定参数
///
/// # 示例
///
/// ```
/// use leap_kinematics::MetricConfig;
///
/// let config = MetricConfig {
///     max_flexion_degrees: 600.0,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// 张开手掌时的总弯曲角（度）
    #[serde(alias = "minFlexionDegrees")]
    pub min_flexion_degrees: f32,
    /// 完全握拳时的总弯曲角（度）
    #[serde(alias = "maxFlexionDegrees")]
    pub max_flexion_degrees: f32,
    /// 前臂或手掌方向退化时腕活动度的中性值
    #[serde(alias = "wristRomNeutral")]
    pub wrist_rom_neutral: f32,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            min_flexion_degrees: 50.0,
            max_flexion_degrees: 700.0,
            wrist_rom_neutral: 0.5,
        }
    }
}

impl MetricConfig {
    pub fn validate(&self) -> Result<(), MetricConfigError> {
        for (field, value) in [
            ("min_flexion_degrees", self.min_flexion_degrees),
            ("max_flexion_degrees", self.max_flexion_degrees),
            ("wrist_rom_neutral", self.wrist_rom_neutral),
        ] {
            if !value.is_finite() {
                return Err(MetricConfigError::NonFinite { field, value });
            }
        }
        if self.max_flexion_degrees <= self.min_flexion_degrees {
            return Err(MetricConfigError::InvertedFlexionRange {
                min: self.min_flexion_degrees,
                max: self.max_flexion_degrees,
            });
        }
        if !(0.0..=1.0).contains(&self.wrist_rom_neutral) {
            return Err(MetricConfigError::NeutralOutOfRange(self.wrist_rom_neutral));
        }
        Ok(())
    }
}

/// 单只手的三项指标
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricSet {
    pub grip_closure: f32,
    pub forearm_rotation: f32,
    pub wrist_rom: f32,
}

/// 指标计算器
#[derive(Debug, Clone, Default)]
pub struct MetricEngine {
    config: MetricConfig,
}

impl MetricEngine {
    /// 创建计算器
    ///
    /// # 错误
    /// 参数未通过 [`MetricConfig::validate`] 时返回对应错误。
    pub fn new(config: MetricConfig) -> Result<Self, MetricConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// 五指全部骨间夹角之和（度）
    ///
    /// 每指 3 个夹角：掌骨↔近节、近节↔中节、中节↔远节。
    pub fn total_flexion(&self, hand: &Hand) -> f32 {
        hand.digits
            .iter()
            .map(|digit| {
                digit
                    .bones
                    .windows(2)
                    .map(|pair| angle_between_bones(&pair[0], &pair[1]))
                    .sum::<f32>()
            })
            .sum()
    }

    /// 将总弯曲角映射到 `[0, 1]`
    pub fn normalize_flexion(&self, total_flexion: f32) -> f32 {
        let MetricConfig {
            min_flexion_degrees: min,
            max_flexion_degrees: max,
            ..
        } = self.config;
        let n = (total_flexion - min) / (max - min);
        if n.is_nan() { 0.0 } else { n.clamp(0.0, 1.0) }
    }

    /// 握拳程度
    pub fn grip_closure(&self, hand: &Hand) -> f32 {
        self.normalize_flexion(self.total_flexion(hand))
    }

    /// 前臂旋前/旋后程度
    ///
    /// 由掌心法向量在 X-Y 平面的角度映射，结果钳位到 `[0, 1]`。
    pub fn forearm_rotation(&self, hand: &Hand) -> f32 {
        let normal = hand.palm.normal;
        let value = (normal.y.atan2(normal.x) + FRAC_PI_2) / PI;
        if value.is_nan() {
            return 0.5;
        }
        value.clamp(0.0, 1.0)
    }

    /// 腕主动活动度
    ///
    /// 前臂方向与手掌方向的夹角除以 90°，按手掌朝上/朝下取符号后
    /// 由 `[-1, 1]` 映射到 `[0, 1]`。前臂或手掌方向退化时返回
    /// [`MetricConfig::wrist_rom_neutral`]。
    pub fn wrist_active_rom(&self, hand: &Hand) -> f32 {
        let forearm = to_na(hand.arm.direction());
        let palm = to_na(hand.palm.direction);
        let (forearm_len, palm_len) = (forearm.norm(), palm.norm());
        if !(forearm_len > DEGENERATE_MAGNITUDE && palm_len > DEGENERATE_MAGNITUDE)
            || !forearm_len.is_finite()
            || !palm_len.is_finite()
        {
            return self.config.wrist_rom_neutral;
        }

        let forearm = forearm / forearm_len;
        let palm = palm / palm_len;
        let angle = forearm.dot(&palm).clamp(-1.0, 1.0).acos();
        let direction = if palm.y > 0.0 { 1.0 } else { -1.0 };
        ((angle / FRAC_PI_2 * direction + 1.0) / 2.0).clamp(0.0, 1.0)
    }

    /// 计算全部指标
    pub fn compute(&self, hand: &Hand) -> MetricSet {
        MetricSet {
            grip_closure: self.grip_closure(hand),
            forearm_rotation: self.forearm_rotation(hand),
            wrist_rom: self.wrist_active_rom(hand),
        }
    }
}
