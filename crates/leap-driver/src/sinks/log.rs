//! CSV 会话日志
//!
//! 每个会话一个文件：`{client}_session{n}_{exercise}.csv`。同名文件已存在时
//! 会话号递增直到找到空闲文件名，记录中写入的是最终使用的会话号。

use crate::error::{DriverError, SinkError};
use crate::metrics::TrackerMetrics;
use crate::sinks::{FrameBatch, FrameSink, SinkKind};
use leap_kinematics::{FrameRecord, SessionContext};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

/// 客户端名为空时使用的名称
pub const UNKNOWN_CLIENT: &str = "UnknownClient";

/// 表头（55 列，顺序固定）
pub const LOG_HEADER: [&str; 55] = [
    "Client Name",
    "Session Number",
    "Exercise Name",
    "Timestamp",
    "Hand",
    "Thumb X",
    "Thumb Y",
    "Thumb Z",
    "Index X",
    "Index Y",
    "Index Z",
    "Middle X",
    "Middle Y",
    "Middle Z",
    "Ring X",
    "Ring Y",
    "Ring Z",
    "Pinky X",
    "Pinky Y",
    "Pinky Z",
    "Thumb MCP",
    "Thumb PIP",
    "Thumb DIP",
    "Index MCP",
    "Index PIP",
    "Index DIP",
    "Middle MCP",
    "Middle PIP",
    "Middle DIP",
    "Ring MCP",
    "Ring PIP",
    "Ring DIP",
    "Pinky MCP",
    "Pinky PIP",
    "Pinky DIP",
    "Wrist X",
    "Wrist Y",
    "Wrist Z",
    "Wrist Flexion",
    "Wrist Extension",
    "Radial Deviation",
    "Ulnar Deviation",
    "Palm X",
    "Palm Y",
    "Palm Z",
    "Palm Roll",
    "Palm Pitch",
    "Palm Yaw",
    "Hand Roll",
    "Hand Pitch",
    "Hand Yaw",
    "Thumb-Index Distance",
    "Thumb-Middle Distance",
    "Thumb-Ring Distance",
    "Thumb-Pinky Distance",
];

/// 会话日志文件名
pub fn log_file_name(session: &SessionContext) -> String {
    let client = if session.client_name.is_empty() {
        UNKNOWN_CLIENT
    } else {
        session.client_name.as_str()
    };
    format!(
        "{client}_session{}_{}.csv",
        session.session_number, session.exercise_name
    )
}

/// 在 `dir` 下找到第一个不存在的会话日志路径
///
/// 返回路径和对应的会话号。
pub fn resolve_log_path(dir: &Path, session: &SessionContext) -> (PathBuf, u32) {
    let mut candidate = session.clone();
    loop {
        let path = dir.join(log_file_name(&candidate));
        if !path.exists() || candidate.session_number == u32::MAX {
            return (path, candidate.session_number);
        }
        candidate.session_number += 1;
    }
}

/// 渲染一行（列顺序与 [`LOG_HEADER`] 一致）
///
/// "Wrist Extension" 与 "Ulnar Deviation" 两列固定为 `0`。
pub fn log_row(record: &FrameRecord) -> Vec<String> {
    let mut row = Vec::with_capacity(LOG_HEADER.len());
    row.push(record.session.client_name.clone());
    row.push(record.session.session_number.to_string());
    row.push(record.session.exercise_name.clone());
    row.push(record.timestamp.clone());
    row.push(record.side.as_str().to_string());

    fn push_f32(row: &mut Vec<String>, v: f32) {
        row.push(v.to_string());
    }

    for tip in record.fingertips {
        for v in [tip.x, tip.y, tip.z] {
            push_f32(&mut row, v);
        }
    }
    for joint in record.joints {
        for v in joint.as_array() {
            push_f32(&mut row, v);
        }
    }

    let wrist = &record.wrist;
    for v in [wrist.position.x, wrist.position.y, wrist.position.z, wrist.flexion_extension] {
        push_f32(&mut row, v);
    }
    row.push("0".to_string());
    push_f32(&mut row, wrist.radial_ulnar_deviation);
    row.push("0".to_string());

    let palm = &record.palm;
    for v in [
        palm.position.x,
        palm.position.y,
        palm.position.z,
        palm.orientation.roll,
        palm.orientation.pitch,
        palm.orientation.yaw,
        record.hand.roll,
        record.hand.pitch,
        record.hand.yaw,
    ] {
        push_f32(&mut row, v);
    }
    for v in record.distances.as_array() {
        push_f32(&mut row, v);
    }
    row
}

/// CSV 日志通道
pub struct LogSink {
    writer: csv::Writer<File>,
    path: PathBuf,
    session: SessionContext,
    metrics: Arc<TrackerMetrics>,
}

impl LogSink {
    /// 创建会话日志并写入表头
    ///
    /// 文件以独占方式创建，同名文件已存在时会话号递增。
    ///
    /// # 错误
    /// - `DriverError::LogFile`: 目录不可写等
    /// - `DriverError::LogHeader`: 表头写入失败
    pub fn create(
        dir: &Path,
        session: &SessionContext,
        metrics: Arc<TrackerMetrics>,
    ) -> Result<Self, DriverError> {
        let mut resolved = session.clone();
        let (path, file) = loop {
            let (path, number) = resolve_log_path(dir, &resolved);
            resolved.session_number = number;
            match File::options().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && number < u32::MAX => {
                    resolved.session_number += 1;
                },
                Err(source) => return Err(DriverError::LogFile { path, source }),
            }
        };

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(LOG_HEADER)?;
        writer.flush().map_err(|source| DriverError::LogFile {
            path: path.clone(),
            source,
        })?;

        if resolved.session_number != session.session_number {
            info!(
                "Session {} already logged, using session {}",
                session.session_number, resolved.session_number
            );
        }
        info!("Logging to {}", path.display());

        Ok(Self {
            writer,
            path,
            session: resolved,
            metrics,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 最终使用的会话上下文（会话号可能已递增）
    pub fn session(&self) -> &SessionContext {
        &self.session
    }
}

impl FrameSink for LogSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Log
    }

    fn dispatch(&mut self, batch: &FrameBatch<'_>) -> Result<(), SinkError> {
        let mut first_error = None;
        for record in batch.records {
            let row = log_row(record);
            match self.writer.write_record(&row) {
                Ok(()) => {
                    self.metrics.log_rows.fetch_add(1, Ordering::Relaxed);
                    debug!("{}", row.join(","));
                },
                Err(e) => {
                    first_error.get_or_insert(SinkError::Csv(e));
                },
            }
        }
        if !batch.records.is_empty() {
            self.writer.flush()?;
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
