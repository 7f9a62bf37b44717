//! 推送通道（WebSocket 广播）
//!
//! 每帧只序列化一次，随后交给 [`PushServer`] 广播给所有已连接客户端。
//!
//! 消息结构：
//!
//! ```json
//! {
//!   "timestamp": "2026-03-04 05:06:07",
//!   "handPresent": true,
//!   "hands": [ { "side": "Right", "fingers": {..}, "joints": {..}, ... } ],
//!   "fingers": {..}, "joints": {..}, "wrist": {..}, "palm": {..},
//!   "hand": {..}, "distances": {..}, "metrics": {..}
//! }
//! ```
//!
//! 顶层的各分区取自帧中最后一只手，浏览器端直接读取
//! `data.metrics.makeAFist`、`data.distances.thumbIndex` 等字段。
//! 没有手时只有 `timestamp` 与 `handPresent`。

use crate::error::SinkError;
use crate::metrics::TrackerMetrics;
use crate::push::PushServer;
use crate::sinks::{FrameBatch, FrameSink, SinkKind};
use leap_kinematics::{FrameRecord, JointAngles};
use leap_protocol::Vector3;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::warn;

#[derive(Serialize)]
struct Point {
    x: f32,
    y: f32,
    z: f32,
}

impl From<Vector3> for Point {
    fn from(v: Vector3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

#[derive(Serialize)]
struct PerDigit<T> {
    thumb: T,
    index: T,
    middle: T,
    ring: T,
    pinky: T,
}

impl<T> PerDigit<T> {
    fn from_array(values: [T; 5]) -> Self {
        let [thumb, index, middle, ring, pinky] = values;
        Self {
            thumb,
            index,
            middle,
            ring,
            pinky,
        }
    }
}

#[derive(Serialize)]
struct Joints {
    mcp: f32,
    pip: f32,
    dip: f32,
}

impl From<JointAngles> for Joints {
    fn from(j: JointAngles) -> Self {
        Self {
            mcp: j.mcp,
            pip: j.pip,
            dip: j.dip,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Wrist {
    x: f32,
    y: f32,
    z: f32,
    flexion_extension: f32,
    radial_ulnar_deviation: f32,
}

#[derive(Serialize)]
struct Palm {
    x: f32,
    y: f32,
    z: f32,
    roll: f32,
    pitch: f32,
    yaw: f32,
}

#[derive(Serialize)]
struct Angles {
    roll: f32,
    pitch: f32,
    yaw: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Distances {
    thumb_index: f32,
    thumb_middle: f32,
    thumb_ring: f32,
    thumb_pinky: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Metrics {
    make_a_fist: f32,
    pronation_supination: f32,
    #[serde(rename = "wristAROM")]
    wrist_arom: f32,
}

/// 一只手的各分区
#[derive(Serialize)]
struct HandSections {
    fingers: PerDigit<Point>,
    joints: PerDigit<Joints>,
    wrist: Wrist,
    palm: Palm,
    hand: Angles,
    distances: Distances,
    metrics: Metrics,
}

impl HandSections {
    fn of(record: &FrameRecord) -> Self {
        let wrist = &record.wrist;
        let palm = &record.palm;
        Self {
            fingers: PerDigit::from_array(record.fingertips.map(Point::from)),
            joints: PerDigit::from_array(record.joints.map(Joints::from)),
            wrist: Wrist {
                x: wrist.position.x,
                y: wrist.position.y,
                z: wrist.position.z,
                flexion_extension: wrist.flexion_extension,
                radial_ulnar_deviation: wrist.radial_ulnar_deviation,
            },
            palm: Palm {
                x: palm.position.x,
                y: palm.position.y,
                z: palm.position.z,
                roll: palm.orientation.roll,
                pitch: palm.orientation.pitch,
                yaw: palm.orientation.yaw,
            },
            hand: Angles {
                roll: record.hand.roll,
                pitch: record.hand.pitch,
                yaw: record.hand.yaw,
            },
            distances: Distances {
                thumb_index: record.distances.thumb_index,
                thumb_middle: record.distances.thumb_middle,
                thumb_ring: record.distances.thumb_ring,
                thumb_pinky: record.distances.thumb_pinky,
            },
            metrics: Metrics {
                make_a_fist: record.metrics.grip_closure,
                pronation_supination: record.metrics.forearm_rotation,
                wrist_arom: record.metrics.wrist_rom,
            },
        }
    }
}

#[derive(Serialize)]
struct SidedHand {
    side: &'static str,
    #[serde(flatten)]
    sections: HandSections,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    timestamp: &'a str,
    hand_present: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hands: Vec<SidedHand>,
    #[serde(flatten)]
    latest: Option<HandSections>,
}

/// 渲染一帧的推送消息
pub fn frame_payload(
    timestamp: &str,
    hand_present: bool,
    records: &[FrameRecord],
) -> Result<String, serde_json::Error> {
    let payload = Payload {
        timestamp,
        hand_present,
        hands: records
            .iter()
            .map(|record| SidedHand {
                side: record.side.as_str(),
                sections: HandSections::of(record),
            })
            .collect(),
        latest: records.last().map(HandSections::of),
    };
    serde_json::to_string(&payload)
}

/// 推送通道
pub struct PushSink {
    server: Arc<PushServer>,
    metrics: Arc<TrackerMetrics>,
}

impl PushSink {
    pub fn new(server: Arc<PushServer>, metrics: Arc<TrackerMetrics>) -> Self {
        Self { server, metrics }
    }
}

impl FrameSink for PushSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Push
    }

    fn dispatch(&mut self, batch: &FrameBatch<'_>) -> Result<(), SinkError> {
        let message = frame_payload(batch.timestamp, batch.hand_present, batch.records)?;
        let report = self.server.broadcast(&message);
        self.metrics.push_broadcasts.fetch_add(1, Ordering::Relaxed);

        if report.failed > 0 {
            warn!(
                "Push broadcast reached {} of {} clients",
                report.delivered,
                report.total()
            );
            return Err(SinkError::Partial {
                failed: report.failed,
                total: report.total(),
            });
        }
        Ok(())
    }
}
