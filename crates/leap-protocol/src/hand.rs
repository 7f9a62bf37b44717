//! 手部骨骼数据模型
//!
//! 所有类型均为不可变值类型（`Copy`），由设备层逐帧构造，
//! 不保存任何跨帧状态。

use crate::ProtocolError;

/// 三维向量（设备坐标系，单位：毫米）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    /// 零向量
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// 分量相减（`self - other`）
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// 分量相加
    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    /// 标量缩放
    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// 所有分量均为有限值
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// 骨段（两个关节之间的刚性段）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bone {
    /// 近端关节
    pub prev_joint: Vector3,
    /// 远端关节
    pub next_joint: Vector3,
}

impl Bone {
    pub const fn new(prev_joint: Vector3, next_joint: Vector3) -> Self {
        Self {
            prev_joint,
            next_joint,
        }
    }

    /// 骨段方向向量（`next - prev`，未归一化）
    pub fn direction(&self) -> Vector3 {
        self.next_joint.sub(self.prev_joint)
    }
}

/// 手指骨段索引
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum BoneKind {
    Metacarpal = 0,
    Proximal = 1,
    Intermediate = 2,
    Distal = 3,
}

/// 手指（拇指到小指）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum DigitKind {
    Thumb = 0,
    Index = 1,
    Middle = 2,
    Ring = 3,
    Pinky = 4,
}

impl DigitKind {
    /// 按设备顺序排列的全部手指
    pub const ALL: [DigitKind; 5] = [
        DigitKind::Thumb,
        DigitKind::Index,
        DigitKind::Middle,
        DigitKind::Ring,
        DigitKind::Pinky,
    ];

    /// 小写名称（用于推送消息键名和实时消息地址）
    pub fn name(self) -> &'static str {
        match self {
            DigitKind::Thumb => "thumb",
            DigitKind::Index => "index",
            DigitKind::Middle => "middle",
            DigitKind::Ring => "ring",
            DigitKind::Pinky => "pinky",
        }
    }

    /// 首字母大写名称（用于表格列名）
    pub fn title(self) -> &'static str {
        match self {
            DigitKind::Thumb => "Thumb",
            DigitKind::Index => "Index",
            DigitKind::Middle => "Middle",
            DigitKind::Ring => "Ring",
            DigitKind::Pinky => "Pinky",
        }
    }
}

/// 手指：4 段骨骼（掌骨、近节、中节、远节）
///
/// 拇指的掌骨按设备约定为零长度，但仍然保留以保证索引一致。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Digit {
    pub bones: [Bone; 4],
}

impl Digit {
    pub const fn new(bones: [Bone; 4]) -> Self {
        Self { bones }
    }

    /// 由 5 个依次相连的关节点构造手指
    pub fn from_joints(joints: [Vector3; 5]) -> Self {
        Self {
            bones: [
                Bone::new(joints[0], joints[1]),
                Bone::new(joints[1], joints[2]),
                Bone::new(joints[2], joints[3]),
                Bone::new(joints[3], joints[4]),
            ],
        }
    }

    pub fn bone(&self, kind: BoneKind) -> &Bone {
        &self.bones[kind as usize]
    }

    pub fn metacarpal(&self) -> &Bone {
        self.bone(BoneKind::Metacarpal)
    }

    pub fn proximal(&self) -> &Bone {
        self.bone(BoneKind::Proximal)
    }

    pub fn intermediate(&self) -> &Bone {
        self.bone(BoneKind::Intermediate)
    }

    pub fn distal(&self) -> &Bone {
        self.bone(BoneKind::Distal)
    }

    /// 指尖位置（远节骨远端关节）
    pub fn tip(&self) -> Vector3 {
        self.distal().next_joint
    }
}

/// 手掌
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Palm {
    /// 掌心位置
    pub position: Vector3,
    /// 掌心法向量（单位向量，指向掌心外侧）
    pub normal: Vector3,
    /// 掌心方向（单位向量，从掌心指向手指）
    pub direction: Vector3,
}

/// 前臂（肘到腕）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Arm {
    pub prev_joint: Vector3,
    pub next_joint: Vector3,
}

impl Arm {
    /// 前臂方向向量（`next - prev`，未归一化）
    pub fn direction(&self) -> Vector3 {
        self.next_joint.sub(self.prev_joint)
    }
}

/// 左右手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    pub fn as_str(self) -> &'static str {
        match self {
            HandSide::Left => "Left",
            HandSide::Right => "Right",
        }
    }
}

impl std::fmt::Display for HandSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单只手的完整骨骼数据
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hand {
    pub side: HandSide,
    /// 按 [`DigitKind::ALL`] 顺序排列
    pub digits: [Digit; 5],
    pub palm: Palm,
    pub arm: Arm,
}

impl Hand {
    pub fn digit(&self, kind: DigitKind) -> &Digit {
        &self.digits[kind as usize]
    }

    pub fn thumb(&self) -> &Digit {
        self.digit(DigitKind::Thumb)
    }

    pub fn index(&self) -> &Digit {
        self.digit(DigitKind::Index)
    }

    pub fn middle(&self) -> &Digit {
        self.digit(DigitKind::Middle)
    }

    pub fn ring(&self) -> &Digit {
        self.digit(DigitKind::Ring)
    }

    pub fn pinky(&self) -> &Digit {
        self.digit(DigitKind::Pinky)
    }

    /// 由不定长手指序列构造（设备适配层使用）
    ///
    /// # 错误
    /// - `ProtocolError::InvalidDigitCount`: 手指数量不是 5
    pub fn try_from_digits(
        side: HandSide,
        digits: &[Digit],
        palm: Palm,
        arm: Arm,
    ) -> Result<Self, ProtocolError> {
        let digits: [Digit; 5] = digits
            .try_into()
            .map_err(|_| ProtocolError::InvalidDigitCount(digits.len()))?;
        Ok(Self {
            side,
            digits,
            palm,
            arm,
        })
    }
}

/// 追踪帧：某一时刻检测到的全部手（0-2 只，上限由设备决定）
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    /// 设备帧序号
    pub id: u64,
    hands: Vec<Hand>,
}

impl Frame {
    pub fn new(id: u64, hands: Vec<Hand>) -> Self {
        Self { id, hands }
    }

    /// 空帧（视野中无手）
    pub fn empty(id: u64) -> Self {
        Self::new(id, Vec::new())
    }

    /// 由设备原始的 `(hand_count, hands)` 构造，校验两者一致
    ///
    /// # 错误
    /// - `ProtocolError::HandCountMismatch`: 声明数量与数组长度不一致
    pub fn from_raw(id: u64, hand_count: u32, hands: Vec<Hand>) -> Result<Self, ProtocolError> {
        if hand_count as usize != hands.len() {
            return Err(ProtocolError::HandCountMismatch {
                declared: hand_count,
                actual: hands.len(),
            });
        }
        Ok(Self::new(id, hands))
    }

    pub fn hand_count(&self) -> u32 {
        self.hands.len() as u32
    }

    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    /// 是否检测到手
    pub fn has_hands(&self) -> bool {
        !self.hands.is_empty()
    }
}
