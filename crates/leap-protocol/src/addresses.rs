//! 实时消息地址常量
//!
//! 每个标量字段对应一个独立地址，载荷为单个 32 位浮点数。

/// 地址前缀
pub const ADDRESS_PREFIX: &str = "/leap";

/// 手部存在标志（每帧一次，`1.0` / `0.0`）
pub const ADDR_HAND_PRESENCE: &str = "/leap/hand_presence";

// === 指尖坐标 ===
pub const ADDR_THUMB_X: &str = "/leap/thumb_x";
pub const ADDR_THUMB_Y: &str = "/leap/thumb_y";
pub const ADDR_THUMB_Z: &str = "/leap/thumb_z";
pub const ADDR_INDEX_X: &str = "/leap/index_x";
pub const ADDR_INDEX_Y: &str = "/leap/index_y";
pub const ADDR_INDEX_Z: &str = "/leap/index_z";
pub const ADDR_MIDDLE_X: &str = "/leap/middle_x";
pub const ADDR_MIDDLE_Y: &str = "/leap/middle_y";
pub const ADDR_MIDDLE_Z: &str = "/leap/middle_z";
pub const ADDR_RING_X: &str = "/leap/ring_x";
pub const ADDR_RING_Y: &str = "/leap/ring_y";
pub const ADDR_RING_Z: &str = "/leap/ring_z";
pub const ADDR_PINKY_X: &str = "/leap/pinky_x";
pub const ADDR_PINKY_Y: &str = "/leap/pinky_y";
pub const ADDR_PINKY_Z: &str = "/leap/pinky_z";

// === 指间距离 ===
pub const ADDR_THUMB_INDEX_DISTANCE: &str = "/leap/thumb_index_distance";
pub const ADDR_THUMB_MIDDLE_DISTANCE: &str = "/leap/thumb_middle_distance";
pub const ADDR_THUMB_RING_DISTANCE: &str = "/leap/thumb_ring_distance";
pub const ADDR_THUMB_PINKY_DISTANCE: &str = "/leap/thumb_pinky_distance";

// === 训练指标（0-1） ===
pub const ADDR_MAKE_A_FIST: &str = "/leap/make_a_fist";
pub const ADDR_PRONATION_SUPINATION: &str = "/leap/pronation_supination";
pub const ADDR_WRIST_AROM: &str = "/leap/wrist_arom";

/// 每只手每帧发送的地址（按发送顺序）
pub const HAND_FIELD_ADDRESSES: [&str; 22] = [
    ADDR_THUMB_X,
    ADDR_THUMB_Y,
    ADDR_THUMB_Z,
    ADDR_INDEX_X,
    ADDR_INDEX_Y,
    ADDR_INDEX_Z,
    ADDR_MIDDLE_X,
    ADDR_MIDDLE_Y,
    ADDR_MIDDLE_Z,
    ADDR_RING_X,
    ADDR_RING_Y,
    ADDR_RING_Z,
    ADDR_PINKY_X,
    ADDR_PINKY_Y,
    ADDR_PINKY_Z,
    ADDR_THUMB_INDEX_DISTANCE,
    ADDR_THUMB_MIDDLE_DISTANCE,
    ADDR_THUMB_RING_DISTANCE,
    ADDR_THUMB_PINKY_DISTANCE,
    ADDR_MAKE_A_FIST,
    ADDR_PRONATION_SUPINATION,
    ADDR_WRIST_AROM,
];
