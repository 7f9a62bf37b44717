//! # 会话日志分析
//!
//! 读取目录下的全部会话日志，按练习与会话号分组，为每种练习计算一个
//! 逐行指标并汇总为描述统计，输出 `{exercise}_summary.csv`
//! （列：`Session Number,Metric,Value`）。
//!
//! 文件名包含 `metrics` 的 CSV、缺少身份列（客户端、会话号、练习名）的文件
//! 会被跳过。

use crate::statistics::{self, Summary};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 身份列
pub const IDENTITY_COLUMNS: [&str; 3] = ["Client Name", "Session Number", "Exercise Name"];

/// 分析用到的数值列
pub const NUMERIC_COLUMNS: [&str; 36] = [
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
    "Wrist Flexion",
    "Wrist Extension",
    "Radial Deviation",
    "Ulnar Deviation",
    "Palm Roll",
    "Hand Roll",
];

const FINGERTIP_COLUMNS: std::ops::Range<usize> = 0..15;
const JOINT_COLUMNS: std::ops::Range<usize> = 15..30;
/// Middle X ..= Pinky Z
const OUTER_FINGERTIP_COLUMNS: std::ops::Range<usize> = 6..15;
const WRIST_COLUMNS: std::ops::Range<usize> = 30..34;
const PALM_ROLL: usize = 34;
const HAND_ROLL: usize = 35;

/// 日志中的一行（只保留分析需要的列）
#[derive(Debug, Clone, PartialEq)]
pub struct LogSample {
    pub client_name: String,
    pub session_number: u32,
    pub exercise_name: String,
    /// 按 [`NUMERIC_COLUMNS`] 排列，缺失或无法解析时为 NaN
    values: [f64; 36],
}

impl LogSample {
    pub fn new(
        client_name: impl Into<String>,
        session_number: u32,
        exercise_name: impl Into<String>,
        values: [f64; 36],
    ) -> Self {
        Self {
            client_name: client_name.into(),
            session_number,
            exercise_name: exercise_name.into(),
            values,
        }
    }

    /// 按列名取值（未知列为 NaN）
    pub fn value(&self, column: &str) -> f64 {
        NUMERIC_COLUMNS
            .iter()
            .position(|name| *name == column)
            .map_or(f64::NAN, |index| self.values[index])
    }

    /// 行内求和（忽略缺失值）
    fn sum(&self, columns: std::ops::Range<usize>) -> f64 {
        self.values[columns].iter().filter(|v| v.is_finite()).sum()
    }

    fn thumb_index_distance(&self) -> f64 {
        let thumb = &self.values[0..3];
        let index = &self.values[3..6];
        thumb
            .iter()
            .zip(index)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

/// 加载结果
#[derive(Debug, Default)]
pub struct LoadedLogs {
    pub samples: Vec<LogSample>,
    /// 成功读取的文件
    pub files: Vec<PathBuf>,
    /// 被跳过的文件
    pub skipped: Vec<PathBuf>,
}

/// 读取目录下的全部会话日志（按文件名排序）
///
/// # 错误
/// 目录不可读时返回错误；单个文件的问题只记录并跳过。
pub fn load_logs(dir: &Path) -> Result<LoadedLogs> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read log directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    paths.sort();

    let mut loaded = LoadedLogs::default();
    for path in paths {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if name.contains("metrics") {
            debug!("Skipping metrics file {}", path.display());
            continue;
        }
        match load_file(&path) {
            Ok(samples) => {
                info!("Loaded {} rows from {}", samples.len(), path.display());
                loaded.samples.extend(samples);
                loaded.files.push(path);
            },
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                loaded.skipped.push(path);
            },
        }
    }
    Ok(loaded)
}

fn load_file(path: &Path) -> Result<Vec<LogSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = reader.headers().context("Failed to read header")?.clone();
    let find = |name: &str| headers.iter().position(|h| h.trim() == name);

    let missing: Vec<&str> = IDENTITY_COLUMNS
        .iter()
        .copied()
        .filter(|name| find(*name).is_none())
        .collect();
    if !missing.is_empty() {
        bail!("missing required columns {:?}", missing);
    }
    let [client, session, exercise] = IDENTITY_COLUMNS.map(|name| find(name).unwrap_or(0));
    let numeric = NUMERIC_COLUMNS.map(find);

    let mut samples = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed row {}", line + 2))?;
        let Some(session_number) = record
            .get(session)
            .and_then(|s| s.trim().parse::<u32>().ok())
        else {
            debug!("Row {} has no session number, skipped", line + 2);
            continue;
        };
        let values = numeric.map(|index| {
            index
                .and_then(|i| record.get(i))
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        });
        samples.push(LogSample {
            client_name: record.get(client).unwrap_or_default().to_string(),
            session_number,
            exercise_name: record.get(exercise).unwrap_or_default().to_string(),
            values,
        });
    }
    Ok(samples)
}

/// 练习类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exercise {
    MakeAFist,
    ThumbTouch,
    PincerGrip,
    WristArom,
    PronationSupination,
}

impl Exercise {
    pub const ALL: [Exercise; 5] = [
        Exercise::MakeAFist,
        Exercise::ThumbTouch,
        Exercise::PincerGrip,
        Exercise::WristArom,
        Exercise::PronationSupination,
    ];

    /// 日志中 "Exercise Name" 列使用的名称
    pub fn name(self) -> &'static str {
        match self {
            Exercise::MakeAFist => "make_a_fist",
            Exercise::ThumbTouch => "thumb_touch",
            Exercise::PincerGrip => "pincer_grip",
            Exercise::WristArom => "wrist_arom",
            Exercise::PronationSupination => "pronation_supination",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    pub fn summary_file_name(self) -> String {
        format!("{}_summary.csv", self.name())
    }

    /// 逐行指标（前臂旋转练习没有逐行指标）
    fn row_metric(self, sample: &LogSample) -> Option<f64> {
        match self {
            // 15 个指尖坐标之和
            Exercise::MakeAFist => Some(sample.sum(FINGERTIP_COLUMNS)),
            Exercise::ThumbTouch => Some(sample.thumb_index_distance()),
            Exercise::PincerGrip => {
                Some(sample.thumb_index_distance() + sample.sum(OUTER_FINGERTIP_COLUMNS))
            },
            Exercise::WristArom => {
                let wrist: f64 = sample.values[WRIST_COLUMNS].iter().sum();
                Some(wrist + sample.sum(JOINT_COLUMNS))
            },
            Exercise::PronationSupination => None,
        }
    }
}

/// 汇总表中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Session Number")]
    pub session_number: u32,
    #[serde(rename = "Metric")]
    pub metric: String,
    /// 无法计算时为空
    #[serde(rename = "Value")]
    pub value: Option<f64>,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// 按会话号分组（保持行顺序）
fn by_session<'a>(samples: &[&'a LogSample]) -> BTreeMap<u32, Vec<&'a LogSample>> {
    let mut groups: BTreeMap<u32, Vec<&LogSample>> = BTreeMap::new();
    for sample in samples {
        groups.entry(sample.session_number).or_default().push(*sample);
    }
    groups
}

/// 把 `会话 → [指标值]` 展开为汇总行（先按指标、再按会话排列）
fn melt(names: &[&str], per_session: &BTreeMap<u32, Vec<Option<f64>>>) -> Vec<SummaryRow> {
    let mut rows = Vec::with_capacity(names.len() * per_session.len());
    for (i, name) in names.iter().enumerate() {
        for (&session_number, values) in per_session {
            rows.push(SummaryRow {
                session_number,
                metric: name.to_string(),
                value: values.get(i).copied().flatten(),
            });
        }
    }
    rows
}

/// 前臂旋转练习的指标名
pub const PRONATION_METRICS: [&str; 4] = [
    "Pronation Supination Metric",
    "Palm Roll Range Mean",
    "Palm Roll Std",
    "Hand Roll Std",
];

/// 前臂旋转：按掌滚转角的增减方向切分动作周期
///
/// 返回 [综合指标, 周期幅度均值, 掌滚转标准差, 手滚转标准差]，
/// 综合指标为后三项的平均。
fn pronation_metrics(samples: &[&LogSample]) -> [f64; 4] {
    let palm: Vec<f64> = samples.iter().map(|s| s.values[PALM_ROLL]).collect();
    let hand: Vec<f64> = samples.iter().map(|s| s.values[HAND_ROLL]).collect();

    // true = 旋后（滚转角增大）；首行没有增量，视为旋前
    let supinating: Vec<bool> = (0..palm.len())
        .map(|i| i > 0 && palm[i] - palm[i - 1] > 0.0)
        .collect();

    let mut ranges = Vec::new();
    let mut start = 0;
    for end in 1..=palm.len() {
        if end == palm.len() || supinating[end] != supinating[start] {
            ranges.push(Summary::of(&palm[start..end]).map_or(f64::NAN, |s| s.range()));
            start = end;
        }
    }

    let range_mean = statistics::mean(&ranges);
    let palm_std = statistics::sample_std_dev(&palm);
    let hand_std = statistics::sample_std_dev(&hand);
    [
        (range_mean + palm_std + hand_std) / 3.0,
        range_mean,
        palm_std,
        hand_std,
    ]
}

/// 计算一种练习的汇总表
///
/// `samples` 中其他练习的行会被忽略。
pub fn analyze_exercise(exercise: Exercise, samples: &[LogSample]) -> Vec<SummaryRow> {
    let selected: Vec<&LogSample> = samples
        .iter()
        .filter(|s| s.exercise_name == exercise.name())
        .collect();
    let groups = by_session(&selected);

    let per_session: BTreeMap<u32, Vec<Option<f64>>> = groups
        .into_iter()
        .map(|(session, rows)| {
            let values = match exercise {
                Exercise::PronationSupination => {
                    pronation_metrics(&rows).into_iter().map(finite).collect()
                },
                _ => {
                    let metric: Vec<f64> =
                        rows.iter().filter_map(|s| exercise.row_metric(s)).collect();
                    match Summary::of(&metric) {
                        Some(summary) => summary.values().into_iter().map(finite).collect(),
                        None => vec![None; Summary::METRIC_NAMES.len()],
                    }
                },
            };
            (session, values)
        })
        .collect();

    match exercise {
        Exercise::PronationSupination => melt(&PRONATION_METRICS, &per_session),
        _ => melt(&Summary::METRIC_NAMES, &per_session),
    }
}

/// 写出汇总表
pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// 目录分析结果
#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub samples: usize,
    /// 已写出的汇总文件
    pub summaries: Vec<(Exercise, PathBuf)>,
    /// 没有数据的练习
    pub empty: Vec<Exercise>,
}

/// 分析 `input` 下的全部日志，把汇总表写到 `output`
///
/// # 错误
/// 目录不可读、没有任何有效日志或汇总文件无法写出时返回错误。
pub fn analyze_directory(input: &Path, output: &Path) -> Result<AnalysisReport> {
    let loaded = load_logs(input)?;
    if loaded.samples.is_empty() {
        bail!("No valid log data found in {}", input.display());
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    let mut report = AnalysisReport {
        files_loaded: loaded.files.len(),
        files_skipped: loaded.skipped.len(),
        samples: loaded.samples.len(),
        ..Default::default()
    };

    for exercise in Exercise::ALL {
        let rows = analyze_exercise(exercise, &loaded.samples);
        if rows.is_empty() {
            info!("No data available for {}", exercise.name());
            report.empty.push(exercise);
            continue;
        }
        let path = output.join(exercise.summary_file_name());
        write_summary(&path, &rows)?;
        info!("Wrote {}", path.display());
        report.summaries.push((exercise, path));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(session: u32, exercise: &str, fill: impl Fn(usize) -> f64) -> LogSample {
        LogSample::new("Alice", session, exercise, std::array::from_fn(fill))
    }

    #[test]
    fn test_value_lookup() {
        let s = sample(1, "make_a_fist", |i| i as f64);
        assert_eq!(s.value("Thumb X"), 0.0);
        assert_eq!(s.value("Hand Roll"), 35.0);
        assert!(s.value("Palm Yaw").is_nan());
    }

    #[test]
    fn test_make_a_fist_sums_fingertip_coordinates() {
        let samples = vec![
            sample(1, "make_a_fist", |i| if i < 15 { 1.0 } else { 100.0 }),
            sample(1, "make_a_fist", |i| if i < 15 { 3.0 } else { 100.0 }),
            sample(2, "make_a_fist", |i| if i < 15 { 2.0 } else { 100.0 }),
            sample(1, "thumb_touch", |_| 1000.0),
        ];
        let rows = analyze_exercise(Exercise::MakeAFist, &samples);
        // 5 个统计量 × 2 个会话，先按统计量排列
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].metric, "min");
        assert_eq!((rows[0].session_number, rows[0].value), (1, Some(15.0)));
        assert_eq!((rows[1].session_number, rows[1].value), (2, Some(30.0)));
        assert_eq!(rows[2].metric, "max");
        assert_eq!(rows[2].value, Some(45.0));
        assert_eq!(rows[4].metric, "mean");
        assert_eq!(rows[4].value, Some(30.0));
        // 会话 2 只有一行，标准差为空
        assert_eq!(rows[9].metric, "std");
        assert_eq!(rows[9].value, None);
    }

    #[test]
    fn test_thumb_touch_distance() {
        let mut values = [0.0; 36];
        values[3] = 3.0; // Index X
        values[4] = 4.0; // Index Y
        let samples = vec![LogSample::new("Alice", 1, "thumb_touch", values)];
        let rows = analyze_exercise(Exercise::ThumbTouch, &samples);
        assert_eq!(rows[0].value, Some(5.0));
    }

    #[test]
    fn test_pincer_and_wrist_metrics() {
        let mut values = [0.0; 36];
        values[3] = 3.0;
        values[4] = 4.0;
        values[6] = 1.0; // Middle X
        values[14] = 2.0; // Pinky Z
        values[15] = 10.0; // Thumb MCP
        values[30] = 20.0; // Wrist Flexion
        let pincer = vec![LogSample::new("Alice", 1, "pincer_grip", values)];
        assert_eq!(analyze_exercise(Exercise::PincerGrip, &pincer)[0].value, Some(8.0));

        let wrist = vec![LogSample::new("Alice", 1, "wrist_arom", values)];
        assert_eq!(analyze_exercise(Exercise::WristArom, &wrist)[0].value, Some(30.0));
    }

    #[test]
    fn test_pronation_cycles() {
        // 掌滚转：0 → 10 → 20（旋后），→ 15 → 5（旋前）
        let rolls = [0.0, 10.0, 20.0, 15.0, 5.0];
        let samples: Vec<LogSample> = rolls
            .iter()
            .map(|&roll| {
                sample(4, "pronation_supination", |i| match i {
                    PALM_ROLL => roll,
                    HAND_ROLL => 1.0,
                    _ => 0.0,
                })
            })
            .collect();
        let refs: Vec<&LogSample> = samples.iter().collect();
        let [combined, range_mean, palm_std, hand_std] = pronation_metrics(&refs);

        // 周期：[0]（旋前，幅度 0）、[10, 20]（幅度 10）、[15, 5]（幅度 10）
        assert!((range_mean - 20.0 / 3.0).abs() < 1e-12);
        assert_eq!(hand_std, 0.0);
        assert!((combined - (range_mean + palm_std) / 3.0).abs() < 1e-12);

        let rows = analyze_exercise(Exercise::PronationSupination, &samples);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].metric, "Pronation Supination Metric");
        assert_eq!(rows[3].metric, "Hand Roll Std");
        assert_eq!(rows[3].value, Some(0.0));
    }

    #[test]
    fn test_exercise_names() {
        for exercise in Exercise::ALL {
            assert_eq!(Exercise::from_name(exercise.name()), Some(exercise));
        }
        assert_eq!(Exercise::from_name("juggling"), None);
        assert_eq!(
            Exercise::WristArom.summary_file_name(),
            "wrist_arom_summary.csv"
        );
    }
}
