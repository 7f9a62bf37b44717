//! 合成手部数据源
//!
//! 在没有追踪设备时产生周期性的抓握 / 前臂旋转 / 腕屈伸动作，
//! 用于联调下游的实时消息接收端和浏览器客户端。
//!
//! 坐标约定与设备一致：y 轴向上，手指沿 -z 方向伸出，单位毫米。

use crate::{DeviceError, DeviceEvent, PolicyFlags, TrackingConnection};
use leap_protocol::{Arm, Digit, Frame, Hand, HandSide, Palm, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{FRAC_PI_2, TAU};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 每个指关节在完全握拳时的弯曲角（弧度）
const MAX_JOINT_CURL: f32 = FRAC_PI_2;

/// 掌心高度（设备上方）
const PALM_HEIGHT: f32 = 200.0;

/// 手指参数：(横向偏移, [掌骨, 近节, 中节, 远节] 长度)
///
/// 拇指掌骨长度为 0（设备约定）。
const DIGIT_LAYOUT: [(f32, [f32; 4]); 5] = [
    (-40.0, [0.0, 45.0, 32.0, 25.0]),
    (-20.0, [65.0, 40.0, 25.0, 20.0]),
    (0.0, [62.0, 45.0, 28.0, 21.0]),
    (18.0, [58.0, 42.0, 27.0, 20.0]),
    (34.0, [53.0, 33.0, 20.0, 18.0]),
];

/// 前臂长度
const FOREARM_LENGTH: f32 = 250.0;

/// 合成数据源配置
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// 帧率（Hz）
    pub frame_rate_hz: f64,
    /// 每帧出现的手
    pub sides: Vec<HandSide>,
    /// 一个完整动作周期的时长
    pub cycle_period: Duration,
    /// 周期中手可见的比例（0-1），其余时间产生空帧
    pub presence_duty: f32,
    /// 关节坐标随机抖动幅度（毫米）
    pub jitter_mm: f32,
    /// 随机种子（`None` 时使用系统熵）
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 60.0,
            sides: vec![HandSide::Right],
            cycle_period: Duration::from_secs(4),
            presence_duty: 0.9,
            jitter_mm: 0.5,
            seed: None,
        }
    }
}

fn rotate_x(v: Vector3, angle: f32) -> Vector3 {
    let (s, c) = angle.sin_cos();
    Vector3::new(v.x, v.y * c - v.z * s, v.y * s + v.z * c)
}

fn rotate_z(v: Vector3, angle: f32) -> Vector3 {
    let (s, c) = angle.sin_cos();
    Vector3::new(v.x * c - v.y * s, v.x * s + v.y * c, v.z)
}

/// 构造一只合成手
///
/// # 参数
/// - `closure`: 握拳程度（0 = 完全张开，1 = 每个指关节弯曲 90°）
/// - `roll_rad`: 前臂绕自身轴线的旋转（弧度）
/// - `flex_rad`: 腕部屈伸角（弧度，正值向上）
///
/// 当 `closure = 0` 时所有骨段共线，15 个关节角均为 0°。
pub fn synthetic_hand(side: HandSide, closure: f32, roll_rad: f32, flex_rad: f32) -> Hand {
    let closure = closure.clamp(0.0, 1.0);
    let mirror = match side {
        HandSide::Right => 1.0,
        HandSide::Left => -1.0,
    };
    let center = Vector3::new(mirror * 120.0, PALM_HEIGHT, 0.0);
    let wrist = Vector3::new(0.0, 0.0, 60.0);

    // 局部坐标（以掌心为原点）-> 腕屈伸 -> 前臂旋转 -> 平移
    let place = |local: Vector3| -> Vector3 {
        let flexed = rotate_x(local.sub(wrist), flex_rad).add(wrist);
        rotate_z(flexed, roll_rad).add(center)
    };
    let orient = |local: Vector3| -> Vector3 { rotate_z(rotate_x(local, flex_rad), roll_rad) };

    let curl = closure * MAX_JOINT_CURL;
    let mut digits = [Digit::default(); 5];
    for (digit, &(offset, lengths)) in digits.iter_mut().zip(DIGIT_LAYOUT.iter()) {
        let mut joints = [Vector3::ZERO; 5];
        joints[0] = Vector3::new(mirror * offset, 0.0, wrist.z - 20.0);
        // 掌骨沿 -z，其后的每个关节在 y-z 平面内依次向掌侧弯曲 `curl`
        let forward = Vector3::new(0.0, 0.0, -1.0);
        for (i, &length) in lengths.iter().enumerate() {
            let dir = rotate_x(forward, -(i as f32) * curl);
            joints[i + 1] = joints[i].add(dir.scale(length));
        }
        *digit = Digit::from_joints(joints.map(&place));
    }

    let palm = Palm {
        position: place(Vector3::ZERO),
        normal: orient(Vector3::new(0.0, -1.0, 0.0)),
        direction: orient(Vector3::new(0.0, 0.0, -1.0)),
    };
    let arm = Arm {
        prev_joint: rotate_z(Vector3::new(0.0, 0.0, wrist.z + FOREARM_LENGTH), roll_rad)
            .add(center),
        next_joint: rotate_z(wrist, roll_rad).add(center),
    };

    Hand {
        side,
        digits,
        palm,
        arm,
    }
}

/// 合成追踪连接
///
/// 首次轮询返回 [`DeviceEvent::Connection`]，之后按帧率节拍返回追踪帧。
pub struct SyntheticConnection {
    config: SyntheticConfig,
    rng: StdRng,
    opened: bool,
    connected: bool,
    frame_id: u64,
    started: Instant,
    next_frame: Instant,
    policy: PolicyFlags,
}

impl SyntheticConnection {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let now = Instant::now();
        Self {
            config,
            rng,
            opened: false,
            connected: false,
            frame_id: 0,
            started: now,
            next_frame: now,
            policy: PolicyFlags::NONE,
        }
    }

    /// 当前生效的策略标志
    pub fn policy(&self) -> PolicyFlags {
        self.policy
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.frame_rate_hz.max(1.0))
    }

    fn jitter(&mut self, v: Vector3) -> Vector3 {
        let j = self.config.jitter_mm.abs();
        if j == 0.0 {
            return v;
        }
        Vector3::new(
            v.x + self.rng.gen_range(-j..=j),
            v.y + self.rng.gen_range(-j..=j),
            v.z + self.rng.gen_range(-j..=j),
        )
    }

    /// 生成时刻 `elapsed` 对应的帧
    fn frame_at(&mut self, elapsed: Duration) -> Frame {
        self.frame_id += 1;
        let cycle = self.config.cycle_period.as_secs_f32().max(f32::EPSILON);
        let phase = (elapsed.as_secs_f32() / cycle).fract();
        if phase >= self.config.presence_duty {
            return Frame::empty(self.frame_id);
        }

        let wave = (TAU * phase).sin();
        let closure = 0.5 - 0.5 * (TAU * phase).cos();
        let sides = self.config.sides.clone();
        let hands = sides
            .into_iter()
            .map(|side| {
                let mut hand = synthetic_hand(side, closure, 0.8 * wave, 0.6 * wave);
                for digit in hand.digits.iter_mut() {
                    for bone in digit.bones.iter_mut() {
                        bone.next_joint = self.jitter(bone.next_joint);
                    }
                    // 保持骨段首尾相连
                    for i in 1..4 {
                        digit.bones[i].prev_joint = digit.bones[i - 1].next_joint;
                    }
                }
                hand
            })
            .collect();
        Frame::new(self.frame_id, hands)
    }
}

impl TrackingConnection for SyntheticConnection {
    fn open(&mut self) -> Result<(), DeviceError> {
        let now = Instant::now();
        self.opened = true;
        self.connected = false;
        self.started = now;
        self.next_frame = now;
        info!(
            "Synthetic tracking source opened ({} Hz, {} hand(s))",
            self.config.frame_rate_hz,
            self.config.sides.len()
        );
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Result<DeviceEvent, DeviceError> {
        if !self.opened {
            return Err(DeviceError::NotOpen);
        }
        if !self.connected {
            self.connected = true;
            return Ok(DeviceEvent::Connection);
        }

        let now = Instant::now();
        if self.next_frame > now {
            let wait = self.next_frame - now;
            if wait > timeout {
                std::thread::sleep(timeout);
                return Err(DeviceError::Timeout);
            }
            std::thread::sleep(wait);
        }

        let period = self.frame_period();
        self.next_frame += period;
        let now = Instant::now();
        if self.next_frame < now {
            // 落后超过一帧时重新对齐节拍，不补发
            self.next_frame = now + period;
        }

        let frame = self.frame_at(now - self.started);
        Ok(DeviceEvent::Tracking(frame))
    }

    fn set_policy(&mut self, set: PolicyFlags, clear: PolicyFlags) -> Result<(), DeviceError> {
        self.policy = PolicyFlags::from_bits((self.policy.bits() | set.bits()) & !clear.bits());
        debug!("Synthetic policy set to {:#x}", self.policy.bits());
        Ok(())
    }

    fn close(&mut self) {
        if self.opened {
            self.opened = false;
            info!("Synthetic tracking source closed after {} frames", self.frame_id);
        }
    }

    fn describe(&self) -> String {
        format!("synthetic hand source @ {} Hz", self.config.frame_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angle_deg(a: Vector3, b: Vector3) -> f32 {
        let dot = a.x * b.x + a.y * b.y + a.z * b.z;
        let na = (a.x * a.x + a.y * a.y + a.z * a.z).sqrt();
        let nb = (b.x * b.x + b.y * b.y + b.z * b.z).sqrt();
        (dot / (na * nb)).clamp(-1.0, 1.0).acos().to_degrees()
    }

    #[test]
    fn test_open_hand_bones_are_collinear() {
        let hand = synthetic_hand(HandSide::Right, 0.0, 0.0, 0.0);
        for digit in &hand.digits[1..] {
            for pair in digit.bones.windows(2) {
                let angle = angle_deg(pair[0].direction(), pair[1].direction());
                assert!(angle < 1e-3, "angle = {angle}");
            }
        }
    }

    #[test]
    fn test_closed_hand_bends_each_joint_ninety_degrees() {
        let hand = synthetic_hand(HandSide::Left, 1.0, 0.3, -0.2);
        let index = hand.index();
        let angle = angle_deg(index.proximal().direction(), index.intermediate().direction());
        assert!((angle - 90.0).abs() < 1e-2, "angle = {angle}");
        // 拇指掌骨为零长度
        assert_eq!(hand.thumb().metacarpal().direction(), Vector3::ZERO);
    }

    #[test]
    fn test_palm_vectors_follow_roll() {
        let hand = synthetic_hand(HandSide::Right, 0.5, FRAC_PI_2, 0.0);
        // 绕 z 轴转 90° 后掌心法向量从 -y 转到 +x
        assert!((hand.palm.normal.x - 1.0).abs() < 1e-5);
        assert!(hand.palm.normal.y.abs() < 1e-5);
    }

    #[test]
    fn test_connection_event_then_frames() {
        let mut conn = SyntheticConnection::new(SyntheticConfig {
            frame_rate_hz: 1000.0,
            seed: Some(7),
            ..Default::default()
        });
        assert!(matches!(conn.poll(Duration::ZERO), Err(DeviceError::NotOpen)));

        conn.open().unwrap();
        assert_eq!(
            conn.poll(Duration::from_millis(10)).unwrap(),
            DeviceEvent::Connection
        );
        match conn.poll(Duration::from_millis(10)).unwrap() {
            DeviceEvent::Tracking(frame) => {
                assert_eq!(frame.id, 1);
                assert_eq!(frame.hand_count(), 1);
                for hand in frame.hands() {
                    for digit in &hand.digits {
                        for pair in digit.bones.windows(2) {
                            assert_eq!(pair[0].next_joint, pair[1].prev_joint);
                        }
                    }
                }
            },
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_slow_rate_times_out() {
        let mut conn = SyntheticConnection::new(SyntheticConfig {
            frame_rate_hz: 1.0,
            ..Default::default()
        });
        conn.open().unwrap();
        conn.poll(Duration::ZERO).unwrap();
        // 第一帧立即产生，第二帧需等待 1 秒
        assert!(conn.poll(Duration::from_millis(5)).is_ok());
        assert!(conn.poll(Duration::from_millis(5)).unwrap_err().is_timeout());
    }

    #[test]
    fn test_absent_phase_yields_empty_frames() {
        let mut conn = SyntheticConnection::new(SyntheticConfig {
            presence_duty: 0.0,
            jitter_mm: 0.0,
            ..Default::default()
        });
        let frame = conn.frame_at(Duration::from_millis(100));
        assert!(!frame.has_hands());
    }

    #[test]
    fn test_policy_set_and_clear() {
        let mut conn = SyntheticConnection::new(SyntheticConfig::default());
        conn.set_policy(PolicyFlags::IMAGES | PolicyFlags::MAP_POINTS, PolicyFlags::NONE)
            .unwrap();
        conn.set_policy(PolicyFlags::NONE, PolicyFlags::IMAGES).unwrap();
        assert_eq!(conn.policy(), PolicyFlags::MAP_POINTS);
    }
}
