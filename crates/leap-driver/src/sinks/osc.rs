//! OSC 实时消息通道（UDP）
//!
//! 每帧先发送一条手部存在标志，再为每只手按
//! [`HAND_FIELD_ADDRESSES`] 顺序发送 22 条浮点消息。
//! 单条发送失败只记录，不中断后续消息，也不重试。

use crate::error::{DriverError, SinkError};
use crate::metrics::TrackerMetrics;
use crate::sinks::{FrameBatch, FrameSink, SinkKind};
use leap_kinematics::FrameRecord;
use leap_protocol::{ADDR_HAND_PRESENCE, HAND_FIELD_ADDRESSES, encode_float_message};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{trace, warn};

/// 一只手的 22 个实时字段（顺序与 [`HAND_FIELD_ADDRESSES`] 一致）
pub fn hand_field_values(record: &FrameRecord) -> [f32; 22] {
    let mut values = [0.0f32; 22];
    for (i, tip) in record.fingertips.iter().enumerate() {
        values[i * 3] = tip.x;
        values[i * 3 + 1] = tip.y;
        values[i * 3 + 2] = tip.z;
    }
    values[15..19].copy_from_slice(&record.distances.as_array());
    values[19] = record.metrics.grip_closure;
    values[20] = record.metrics.forearm_rotation;
    values[21] = record.metrics.wrist_rom;
    values
}

/// OSC 通道
pub struct OscSink {
    socket: UdpSocket,
    target: SocketAddr,
    metrics: Arc<TrackerMetrics>,
}

impl OscSink {
    /// 绑定本地 UDP 端口并解析目标地址
    ///
    /// # 错误
    /// - `DriverError::Socket`: 绑定失败或目标地址无法解析
    pub fn connect(
        host: &str,
        port: u16,
        metrics: Arc<TrackerMetrics>,
    ) -> Result<Self, DriverError> {
        let target = (host, port)
            .to_socket_addrs()
            .map_err(DriverError::Socket)?
            .next()
            .ok_or_else(|| {
                DriverError::Socket(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("no address for {host}:{port}"),
                ))
            })?;
        let bind_addr: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr).map_err(DriverError::Socket)?;
        Ok(Self {
            socket,
            target,
            metrics,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// 发送一条消息（报文长度即编码长度）
    fn send(&self, address: &str, value: f32) -> Result<(), SinkError> {
        let packet = encode_float_message(address, value)?;
        self.socket.send_to(&packet, self.target)?;
        trace!("OSC {} {}", address, value);
        Ok(())
    }

    /// 发送并计数，返回是否成功
    fn send_counted(&self, address: &str, value: f32) -> bool {
        match self.send(address, value) {
            Ok(()) => {
                self.metrics.osc_messages.fetch_add(1, Ordering::Relaxed);
                true
            },
            Err(e) => {
                warn!("Failed to send OSC message {} to {}: {}", address, self.target, e);
                false
            },
        }
    }
}

impl FrameSink for OscSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Osc
    }

    fn dispatch(&mut self, batch: &FrameBatch<'_>) -> Result<(), SinkError> {
        let presence = if batch.hand_present { 1.0 } else { 0.0 };
        let mut total = 1;
        let mut failed = usize::from(!self.send_counted(ADDR_HAND_PRESENCE, presence));

        for record in batch.records {
            for (address, value) in HAND_FIELD_ADDRESSES.iter().zip(hand_field_values(record)) {
                total += 1;
                if !self.send_counted(address, value) {
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(SinkError::Partial { failed, total });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leap_kinematics::{FrameRecordBuilder, SessionContext};
    use leap_protocol::{ADDR_MAKE_A_FIST, ADDR_THUMB_X, Frame, HandSide, decode_float_message};
    use std::time::Duration;

    fn receiver() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        socket
    }

    fn recv_all(socket: &UdpSocket, count: usize) -> Vec<(String, f32)> {
        let mut buf = [0u8; 2048];
        (0..count)
            .map(|_| {
                let (len, _) = socket.recv_from(&mut buf).unwrap();
                let msg = decode_float_message(&buf[..len]).unwrap();
                (msg.address, msg.value)
            })
            .collect()
    }

    #[test]
    fn test_empty_frame_sends_only_presence() {
        let rx = receiver();
        let port = rx.local_addr().unwrap().port();
        let metrics = Arc::new(TrackerMetrics::new());
        let mut sink = OscSink::connect("127.0.0.1", port, metrics.clone()).unwrap();

        sink.dispatch(&FrameBatch {
            timestamp: "t",
            hand_present: false,
            records: &[],
        })
        .unwrap();

        let messages = recv_all(&rx, 1);
        assert_eq!(messages, vec![(ADDR_HAND_PRESENCE.to_string(), 0.0)]);
        assert_eq!(metrics.snapshot().osc_messages, 1);
    }

    #[test]
    fn test_hand_frame_sends_presence_then_fields() {
        let rx = receiver();
        let port = rx.local_addr().unwrap().port();
        let metrics = Arc::new(TrackerMetrics::new());
        let mut sink = OscSink::connect("127.0.0.1", port, metrics.clone()).unwrap();

        let hand = leap_device::synthetic_hand(HandSide::Right, 1.0, 0.0, 0.0);
        let frame = Frame::new(1, vec![hand]);
        let records = FrameRecordBuilder::default().build_all(
            &SessionContext::new("Alice", 1, "curl"),
            &frame,
            "t",
        );
        sink.dispatch(&FrameBatch {
            timestamp: "t",
            hand_present: true,
            records: &records,
        })
        .unwrap();

        let messages = recv_all(&rx, 23);
        assert_eq!(messages[0], (ADDR_HAND_PRESENCE.to_string(), 1.0));
        assert_eq!(messages[1].0, ADDR_THUMB_X);
        assert_eq!(messages[1].1, records[0].fingertips[0].x);
        assert_eq!(messages[20], (ADDR_MAKE_A_FIST.to_string(), 1.0));
        let addresses: Vec<_> = messages[1..].iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(addresses, HAND_FIELD_ADDRESSES);
        assert_eq!(metrics.snapshot().osc_messages, 23);
    }

    #[test]
    fn test_unresolvable_host() {
        let metrics = Arc::new(TrackerMetrics::new());
        let result = OscSink::connect("no-such-host.invalid", 9000, metrics);
        assert!(matches!(result, Err(DriverError::Socket(_))));
    }
}
