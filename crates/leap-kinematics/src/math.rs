//! 几何基础运算
//!
//! 所有函数均为纯函数，输出单位为角度（度）。
//!
//! # 退化输入
//!
//! 任一向量模长为 0（或相乘后下溢为 0、或非有限值）时，角度函数返回 `0.0`，
//! 不产生 NaN。反三角函数的输入一律先钳位到定义域。

use leap_protocol::{Bone, Vector3};
use nalgebra::{Vector2, Vector3 as NaVector3};

#[inline]
pub(crate) fn to_na(v: Vector3) -> NaVector3<f32> {
    NaVector3::new(v.x, v.y, v.z)
}

/// 两向量夹角（度），退化时返回 0
fn angle_deg_3(v1: NaVector3<f32>, v2: NaVector3<f32>) -> f32 {
    let magnitude = v1.norm() * v2.norm();
    if !(magnitude > 0.0 && magnitude.is_finite()) {
        return 0.0;
    }
    (v1.dot(&v2) / magnitude).clamp(-1.0, 1.0).acos().to_degrees()
}

fn angle_deg_2(v1: Vector2<f32>, v2: Vector2<f32>) -> f32 {
    let magnitude = v1.norm() * v2.norm();
    if !(magnitude > 0.0 && magnitude.is_finite()) {
        return 0.0;
    }
    (v1.dot(&v2) / magnitude).clamp(-1.0, 1.0).acos().to_degrees()
}

/// 欧氏距离
pub fn distance(a: Vector3, b: Vector3) -> f32 {
    (to_na(a) - to_na(b)).norm()
}

/// 中间点处的关节角
///
/// 计算 `p1→p2` 与 `p2→p3` 两段之间的夹角，范围 `[0, 180]`。
/// 三点共线（关节完全伸直）时为 0°。
///
/// # 示例
///
/// ```
/// use leap_kinematics::math::angle_between_points;
/// use leap_protocol::Vector3;
///
/// let a = Vector3::new(0.0, 0.0, 0.0);
/// let b = Vector3::new(0.0, 0.0, -10.0);
/// let c = Vector3::new(0.0, -10.0, -10.0);
/// assert!((angle_between_points(a, b, c) - 90.0).abs() < 1e-4);
/// ```
pub fn angle_between_points(p1: Vector3, p2: Vector3, p3: Vector3) -> f32 {
    let (p1, p2, p3) = (to_na(p1), to_na(p2), to_na(p3));
    angle_deg_3(p2 - p1, p3 - p2)
}

/// 两骨段方向向量之间的夹角（两段不要求共享端点）
pub fn angle_between_bones(b1: &Bone, b2: &Bone) -> f32 {
    angle_deg_3(to_na(b1.direction()), to_na(b2.direction()))
}

/// 横滚角：`atan2(normal.y, normal.z)`
pub fn roll(normal: Vector3) -> f32 {
    normal.y.atan2(normal.z).to_degrees()
}

/// 俯仰角：`asin(direction.y)`
///
/// 设备给出的单位向量可能略微超出 1，先钳位到 `[-1, 1]`。
pub fn pitch(direction: Vector3) -> f32 {
    direction.y.clamp(-1.0, 1.0).asin().to_degrees()
}

/// 偏航角：`atan2(direction.x, direction.z)`
pub fn yaw(direction: Vector3) -> f32 {
    direction.x.atan2(direction.z).to_degrees()
}

/// 腕屈伸角：两向量在 Y-Z 平面投影的夹角
pub fn wrist_flexion_extension(wrist: Vector3, palm: Vector3) -> f32 {
    angle_deg_2(Vector2::new(wrist.y, wrist.z), Vector2::new(palm.y, palm.z))
}

/// 腕桡尺偏角：两向量在 X-Z 平面投影的夹角
pub fn wrist_radial_ulnar_deviation(wrist: Vector3, palm: Vector3) -> f32 {
    angle_deg_2(Vector2::new(wrist.x, wrist.z), Vector2::new(palm.x, palm.z))
}
