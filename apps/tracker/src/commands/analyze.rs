//! 分析命令
//!
//! 读取目录中的会话日志，为每种练习写出统计摘要表。

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// 分析命令参数
#[derive(Args, Debug)]
pub struct AnalyzeCommand {
    /// 日志目录
    pub directory: PathBuf,

    /// 摘要输出目录（默认：<directory>/plots）
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl AnalyzeCommand {
    pub fn output_dir(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| self.directory.join("plots"))
    }

    /// 执行分析
    pub fn execute(&self) -> Result<()> {
        let output = self.output_dir();
        let report = leap_tools::analyze_directory(&self.directory, &output)?;

        println!(
            "Loaded {} samples from {} log file(s) ({} skipped)",
            report.samples, report.files_loaded, report.files_skipped
        );
        for (exercise, path) in &report.summaries {
            println!("  {:<22} {}", exercise.name(), path.display());
        }
        for exercise in &report.empty {
            println!("  {:<22} no data", exercise.name());
        }
        println!("Analysis complete. Summaries saved in {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_dir() {
        let command = AnalyzeCommand {
            directory: PathBuf::from("logs"),
            output: None,
        };
        assert_eq!(command.output_dir(), PathBuf::from("logs").join("plots"));

        let command = AnalyzeCommand {
            directory: PathBuf::from("logs"),
            output: Some(PathBuf::from("out")),
        };
        assert_eq!(command.output_dir(), PathBuf::from("out"));
    }
}
