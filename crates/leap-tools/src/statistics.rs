//! # 描述统计
//!
//! 每个会话一组：最小值、最大值、均值、中位数、样本标准差。

use statrs::statistics::Statistics;

/// 一组样本的描述统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// 样本标准差（n - 1），少于两个样本时为 NaN
    pub std_dev: f64,
}

impl Summary {
    /// 输出顺序与列名
    pub const METRIC_NAMES: [&'static str; 5] = ["min", "max", "mean", "median", "std"];

    /// 计算描述统计
    ///
    /// 非有限值（空单元格、解析失败）被忽略；没有有效样本时返回 None。
    pub fn of(values: &[f64]) -> Option<Self> {
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        finite.sort_by(f64::total_cmp);

        Some(Self {
            count: finite.len(),
            min: finite[0],
            max: finite[finite.len() - 1],
            mean: Statistics::mean(finite.iter()),
            median: median_of_sorted(&finite),
            std_dev: Statistics::std_dev(finite.iter()),
        })
    }

    /// 按 [`Summary::METRIC_NAMES`] 顺序排列的值
    pub fn values(&self) -> [f64; 5] {
        [self.min, self.max, self.mean, self.median, self.std_dev]
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// 样本标准差（少于两个有效样本时为 NaN）
pub fn sample_std_dev(values: &[f64]) -> f64 {
    Statistics::std_dev(values.iter().filter(|v| v.is_finite()))
}

/// 均值（没有有效样本时为 NaN）
pub fn mean(values: &[f64]) -> f64 {
    Statistics::mean(values.iter().filter(|v| v.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_odd() {
        let summary = Summary::of(&[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 3.0);
        assert_eq!(summary.mean, 2.0);
        assert_eq!(summary.median, 2.0);
        assert!((summary.std_dev - 1.0).abs() < 1e-12);
        assert_eq!(summary.range(), 2.0);
    }

    #[test]
    fn test_summary_even_median() {
        let summary = Summary::of(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.median, 2.5);
        // 样本方差 = 5/3
        assert!((summary.std_dev - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_single_sample_has_no_std() {
        let summary = Summary::of(&[7.0]).unwrap();
        assert_eq!(&summary.values()[..4], &[7.0, 7.0, 7.0, 7.0]);
        assert!(summary.std_dev.is_nan());
    }

    #[test]
    fn test_non_finite_values_ignored() {
        assert!(Summary::of(&[]).is_none());
        assert!(Summary::of(&[f64::NAN]).is_none());
        let summary = Summary::of(&[f64::NAN, 2.0, f64::INFINITY, 4.0]).unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, 3.0);
        assert_eq!(mean(&[f64::NAN, 1.0, 3.0]), 2.0);
        assert!(sample_std_dev(&[1.0]).is_nan());
    }
}
