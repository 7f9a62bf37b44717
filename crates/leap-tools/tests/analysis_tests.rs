//! 会话日志分析集成测试
//!
//! 测试数据用驱动层的日志格式（表头与行渲染）生成，保证两边列名一致。

use leap_device::synthetic_hand;
use leap_driver::sinks::{LOG_HEADER, log_file_name, log_row};
use leap_kinematics::{FrameRecordBuilder, SessionContext};
use leap_protocol::{Frame, HandSide};
use leap_tools::{Exercise, analyze_directory, load_logs};
use std::fs;
use std::path::Path;

/// 写一份会话日志，每个握拳程度一行
fn write_log(dir: &Path, session: &SessionContext, closures: &[f32]) {
    let builder = FrameRecordBuilder::default();
    let mut writer = csv::Writer::from_path(dir.join(log_file_name(session))).unwrap();
    writer.write_record(LOG_HEADER).unwrap();
    for (i, &closure) in closures.iter().enumerate() {
        let hand = synthetic_hand(HandSide::Right, closure, 0.2 * i as f32, 0.0);
        let frame = Frame::new(i as u64, vec![hand]);
        let record = builder.build(session, &frame, &hand, "2026-05-01 10:00:00");
        writer.write_record(log_row(&record)).unwrap();
    }
    writer.flush().unwrap();
}

#[test]
fn test_load_skips_metrics_and_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    write_log(
        dir.path(),
        &SessionContext::new("Alice", 1, "make_a_fist"),
        &[0.0, 0.5],
    );
    fs::write(dir.path().join("Alice_metrics.csv"), "Client Name\nAlice\n").unwrap();
    fs::write(dir.path().join("notes.csv"), "a,b\n1,2\n").unwrap();
    fs::write(dir.path().join("readme.txt"), "not a log").unwrap();

    let loaded = load_logs(dir.path()).unwrap();
    assert_eq!(loaded.samples.len(), 2);
    assert_eq!(loaded.files.len(), 1);
    assert_eq!(loaded.skipped.len(), 1);
    assert!(loaded.skipped[0].ends_with("notes.csv"));

    let sample = &loaded.samples[0];
    assert_eq!(sample.client_name, "Alice");
    assert_eq!(sample.session_number, 1);
    assert_eq!(sample.exercise_name, "make_a_fist");
    assert_eq!(sample.value("Wrist Extension"), 0.0);
    assert!(sample.value("Thumb X").is_finite());
}

#[test]
fn test_analyze_directory_writes_summaries() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let out_dir = output.path().join("plots");

    write_log(
        input.path(),
        &SessionContext::new("Alice", 1, "make_a_fist"),
        &[0.0, 0.5, 1.0],
    );
    write_log(
        input.path(),
        &SessionContext::new("Alice", 2, "make_a_fist"),
        &[0.2, 0.4],
    );
    write_log(
        input.path(),
        &SessionContext::new("Alice", 1, "pronation_supination"),
        &[0.0, 0.0, 0.0, 0.0],
    );

    let report = analyze_directory(input.path(), &out_dir).unwrap();
    assert_eq!(report.files_loaded, 3);
    assert_eq!(report.samples, 9);
    assert_eq!(
        report.summaries.iter().map(|(e, _)| *e).collect::<Vec<_>>(),
        [Exercise::MakeAFist, Exercise::PronationSupination]
    );
    assert_eq!(
        report.empty,
        [
            Exercise::ThumbTouch,
            Exercise::PincerGrip,
            Exercise::WristArom
        ]
    );

    let text = fs::read_to_string(out_dir.join("make_a_fist_summary.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Session Number,Metric,Value");
    // 5 个统计量 × 2 个会话
    assert_eq!(lines.len(), 11);
    assert!(lines[1].starts_with("1,min,"));
    assert!(lines[2].starts_with("2,min,"));
    assert!(lines[9].starts_with("1,std,"));

    let text = fs::read_to_string(out_dir.join("pronation_supination_summary.csv")).unwrap();
    assert!(text.contains("1,Pronation Supination Metric,"));
    assert!(text.contains("1,Hand Roll Std,"));
}

#[test]
fn test_analyze_empty_directory_fails() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let err = analyze_directory(input.path(), output.path()).unwrap_err();
    assert!(err.to_string().contains("No valid log data"));
}
