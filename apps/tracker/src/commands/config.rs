//! 配置命令
//!
//! 输出带默认值的完整配置文件，作为编辑起点。

use anyhow::{Context, Result};
use clap::Args;
use leap_driver::TrackerConfig;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ConfigCommand {
    /// 写入文件（默认输出到终端）
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ConfigCommand {
    pub fn execute(&self) -> Result<()> {
        let text = TrackerConfig::default().to_toml_string()?;
        match &self.output {
            Some(path) => {
                std::fs::write(path, &text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Default configuration written to {}", path.display());
            },
            None => print!("{text}"),
        }
        Ok(())
    }
}
