//! 逐手逐帧记录
//!
//! [`FrameRecordBuilder::build`] 是纯函数：相同输入得到逐位相同的输出，
//! 不做任何 I/O。

use crate::math::{
    angle_between_points, distance, pitch, roll, wrist_flexion_extension,
    wrist_radial_ulnar_deviation, yaw,
};
use crate::metrics::{MetricConfigError, MetricEngine, MetricSet};
use crate::MetricConfig;
use leap_protocol::{Digit, DigitKind, Frame, Hand, HandSide, Vector3};
use serde::{Deserialize, Serialize};

/// 会话上下文（进程启动时确定，之后只读）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub client_name: String,
    pub session_number: u32,
    pub exercise_name: String,
}

impl SessionContext {
    pub fn new(
        client_name: impl Into<String>,
        session_number: u32,
        exercise_name: impl Into<String>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            session_number,
            exercise_name: exercise_name.into(),
        }
    }
}

/// 单指的三个关节角（度）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointAngles {
    pub mcp: f32,
    pub pip: f32,
    pub dip: f32,
}

impl JointAngles {
    /// 沿关节链计算 MCP / PIP / DIP
    pub fn of_digit(digit: &Digit) -> Self {
        let [metacarpal, proximal, intermediate, distal] = digit.bones;
        Self {
            mcp: angle_between_points(
                metacarpal.prev_joint,
                metacarpal.next_joint,
                proximal.next_joint,
            ),
            pip: angle_between_points(
                metacarpal.next_joint,
                proximal.next_joint,
                intermediate.next_joint,
            ),
            dip: angle_between_points(
                proximal.next_joint,
                intermediate.next_joint,
                distal.next_joint,
            ),
        }
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.mcp, self.pip, self.dip]
    }
}

/// 姿态角（度）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// 腕部数据
///
/// 设备不单独采样腕关节，`position` 取掌心位置；屈伸角与偏斜角
/// 也以掌心位置同时作为腕向量和掌向量计算。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WristData {
    pub position: Vector3,
    pub flexion_extension: f32,
    pub radial_ulnar_deviation: f32,
}

/// 手掌数据
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PalmData {
    pub position: Vector3,
    pub orientation: Orientation,
}

/// 拇指指尖到其余四指指尖的距离
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DigitDistances {
    pub thumb_index: f32,
    pub thumb_middle: f32,
    pub thumb_ring: f32,
    pub thumb_pinky: f32,
}

impl DigitDistances {
    pub fn as_array(&self) -> [f32; 4] {
        [
            self.thumb_index,
            self.thumb_middle,
            self.thumb_ring,
            self.thumb_pinky,
        ]
    }
}

/// 一只手在一帧中的完整输出记录
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub session: SessionContext,
    /// 设备帧序号
    pub frame_id: u64,
    /// 本地时间戳（同一帧内的所有手共享）
    pub timestamp: String,
    pub side: HandSide,
    /// 按 [`DigitKind::ALL`] 排列
    pub fingertips: [Vector3; 5],
    /// 按 [`DigitKind::ALL`] 排列
    pub joints: [JointAngles; 5],
    pub wrist: WristData,
    pub palm: PalmData,
    /// 当前与手掌姿态相同
    pub hand: Orientation,
    pub distances: DigitDistances,
    pub metrics: MetricSet,
}

impl FrameRecord {
    pub fn fingertip(&self, kind: DigitKind) -> Vector3 {
        self.fingertips[kind as usize]
    }

    /// 所有数值字段均为有限值
    pub fn is_finite(&self) -> bool {
        let scalars = self
            .joints
            .iter()
            .flat_map(JointAngles::as_array)
            .chain(self.distances.as_array())
            .chain([
                self.wrist.flexion_extension,
                self.wrist.radial_ulnar_deviation,
                self.palm.orientation.roll,
                self.palm.orientation.pitch,
                self.palm.orientation.yaw,
                self.hand.roll,
                self.hand.pitch,
                self.hand.yaw,
                self.metrics.grip_closure,
                self.metrics.forearm_rotation,
                self.metrics.wrist_rom,
            ]);
        self.fingertips.iter().all(Vector3::is_finite)
            && self.wrist.position.is_finite()
            && self.palm.position.is_finite()
            && scalars.into_iter().all(f32::is_finite)
    }
}

/// 记录构建器
#[derive(Debug, Clone, Default)]
pub struct FrameRecordBuilder {
    engine: MetricEngine,
}

impl FrameRecordBuilder {
    pub fn new(config: MetricConfig) -> Result<Self, MetricConfigError> {
        Ok(Self {
            engine: MetricEngine::new(config)?,
        })
    }

    /// 为一只手构建记录
    ///
    /// # 参数
    /// - `session`: 会话上下文
    /// - `frame`: 该手所属的帧
    /// - `hand`: 手部数据
    /// - `timestamp`: 帧时间戳（调用方每帧取一次）
    pub fn build(
        &self,
        session: &SessionContext,
        frame: &Frame,
        hand: &Hand,
        timestamp: &str,
    ) -> FrameRecord {
        let fingertips = hand.digits.map(|digit| digit.tip());
        let joints = hand.digits.map(|digit| JointAngles::of_digit(&digit));

        let thumb = fingertips[DigitKind::Thumb as usize];
        let distances = DigitDistances {
            thumb_index: distance(thumb, fingertips[DigitKind::Index as usize]),
            thumb_middle: distance(thumb, fingertips[DigitKind::Middle as usize]),
            thumb_ring: distance(thumb, fingertips[DigitKind::Ring as usize]),
            thumb_pinky: distance(thumb, fingertips[DigitKind::Pinky as usize]),
        };

        let wrist_position = hand.palm.position;
        let palm_position = hand.palm.position;
        let orientation = Orientation {
            roll: roll(hand.palm.normal),
            pitch: pitch(hand.palm.direction),
            yaw: yaw(hand.palm.direction),
        };

        FrameRecord {
            session: session.clone(),
            frame_id: frame.id,
            timestamp: timestamp.to_string(),
            side: hand.side,
            fingertips,
            joints,
            wrist: WristData {
                position: wrist_position,
                flexion_extension: wrist_flexion_extension(wrist_position, palm_position),
                radial_ulnar_deviation: wrist_radial_ulnar_deviation(wrist_position, palm_position),
            },
            palm: PalmData {
                position: palm_position,
                orientation,
            },
            hand: orientation,
            distances,
            metrics: self.engine.compute(hand),
        }
    }

    /// 为帧中的每只手构建记录（按设备顺序）
    pub fn build_all(
        &self,
        session: &SessionContext,
        frame: &Frame,
        timestamp: &str,
    ) -> Vec<FrameRecord> {
        frame
            .hands()
            .iter()
            .map(|hand| self.build(session, frame, hand, timestamp))
            .collect()
    }
}
