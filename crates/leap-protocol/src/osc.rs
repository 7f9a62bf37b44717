//! OSC 1.0 单浮点消息编解码
//!
//! 报文布局（全部 4 字节对齐，大端）：
//!
//! ```text
//! [address: NUL 结尾字符串，补齐到 4 字节]
//! [type tag: ",f\0\0"]
//! [value: f32 big-endian]
//! ```

use crate::ProtocolError;

/// 单个数据报的最大长度
pub const MAX_PACKET_SIZE: usize = 1024;

/// 单浮点类型标签（含补齐）
const FLOAT_TYPE_TAG: [u8; 4] = [b',', b'f', 0, 0];

/// 已解码的 OSC 消息
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub value: f32,
}

/// 字符串按 OSC 规则补齐后的长度（至少包含一个 NUL）
fn padded_len(len: usize) -> usize {
    (len + 4) & !3
}

fn validate_address(address: &str) -> Result<(), ProtocolError> {
    if !address.starts_with('/') || address.contains('\0') {
        return Err(ProtocolError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

/// 编码单浮点消息
///
/// # 错误
/// - `ProtocolError::InvalidAddress`: 地址不以 '/' 开头或包含 NUL
/// - `ProtocolError::MessageTooLarge`: 报文超过 [`MAX_PACKET_SIZE`]
///
/// # 示例
///
/// ```
/// use leap_protocol::osc::encode_float_message;
///
/// let packet = encode_float_message("/leap/hand_presence", 1.0).unwrap();
/// assert_eq!(packet.len() % 4, 0);
/// ```
pub fn encode_float_message(address: &str, value: f32) -> Result<Vec<u8>, ProtocolError> {
    validate_address(address)?;

    let addr_len = padded_len(address.len());
    let size = addr_len + FLOAT_TYPE_TAG.len() + 4;
    if size > MAX_PACKET_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size,
            limit: MAX_PACKET_SIZE,
        });
    }

    let mut packet = Vec::with_capacity(size);
    packet.extend_from_slice(address.as_bytes());
    packet.resize(addr_len, 0);
    packet.extend_from_slice(&FLOAT_TYPE_TAG);
    packet.extend_from_slice(&value.to_be_bytes());
    Ok(packet)
}

/// 解码单浮点消息
///
/// 仅支持 `,f` 类型标签。
pub fn decode_float_message(packet: &[u8]) -> Result<OscMessage, ProtocolError> {
    if packet.len() % 4 != 0 || packet.len() < 12 {
        return Err(ProtocolError::InvalidLength(packet.len()));
    }

    let nul = packet
        .iter()
        .position(|&b| b == 0)
        .ok_or(ProtocolError::InvalidLength(packet.len()))?;
    let address = std::str::from_utf8(&packet[..nul]).map_err(|_| {
        ProtocolError::InvalidAddress(String::from_utf8_lossy(&packet[..nul]).into())
    })?;
    validate_address(address)?;

    let tag_start = padded_len(nul);
    let tag_end = tag_start + FLOAT_TYPE_TAG.len();
    if packet.len() != tag_end + 4 {
        return Err(ProtocolError::InvalidLength(packet.len()));
    }
    let tag = &packet[tag_start..tag_end];
    if tag != FLOAT_TYPE_TAG {
        return Err(ProtocolError::UnsupportedTypeTag(
            String::from_utf8_lossy(tag).trim_end_matches('\0').to_string(),
        ));
    }

    let mut raw = [0u8; 4];
    raw.copy_from_slice(&packet[tag_end..]);
    Ok(OscMessage {
        address: address.to_string(),
        value: f32::from_be_bytes(raw),
    })
}
