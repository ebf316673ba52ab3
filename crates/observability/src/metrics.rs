//! 对齐与合并指标收集模块
//!
//! 通过 `metrics` facade 记录指标，并在内存中聚合一次合并运行的统计。

use std::collections::BTreeMap;

use contracts::{ClockOffset, FileNumber, MergedRecord, UniqueTime};
use metrics::{counter, gauge, histogram};

/// 记录一个成对样本
pub fn record_pair_sample(delta: ClockOffset) {
    counter!("weaver_pair_samples_total").increment(1);
    histogram!("weaver_pair_delta_ms").record(delta.as_millis_f64().abs());
}

/// 记录一个疑似标签别名
pub fn record_outlier(tag: u32, deviation: ClockOffset) {
    counter!("weaver_sync_outliers_total").increment(1);
    histogram!("weaver_sync_outlier_deviation_ms").record(deviation.as_millis_f64().abs());
    tracing::trace!(tag, %deviation, "outlier recorded");
}

/// 记录某文件的有效偏移
pub fn record_effective_offset(file: FileNumber, offset: ClockOffset) {
    gauge!(
        "weaver_effective_offset_ms",
        "file" => file.get().to_string()
    )
    .set(offset.as_millis_f64());
}

/// 记录对齐结果（成功 / 失败原因）
pub fn record_alignment_outcome(outcome: &'static str) {
    counter!("weaver_alignments_total", "outcome" => outcome).increment(1);
}

/// 记录一条合并输出
pub fn record_merged_record(file: FileNumber) {
    counter!(
        "weaver_merged_records_total",
        "file" => file.get().to_string()
    )
    .increment(1);
}

/// 合并指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct MergeMetricsAggregator {
    /// 合并输出总数
    pub total_records: u64,

    /// 各文件贡献的记录数
    pub records_per_file: BTreeMap<FileNumber, u64>,

    /// 相邻输出记录的间隔统计 (毫秒，对齐后时间轴)
    pub spacing_stats: RunningStats,

    /// 相邻记录来自不同文件的次数
    pub file_switches: u64,

    first: Option<UniqueTime>,
    last: Option<(UniqueTime, FileNumber)>,
}

impl MergeMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, entry: &MergedRecord) {
        let timestamp = entry.record.timestamp;

        self.total_records += 1;
        *self.records_per_file.entry(entry.file).or_insert(0) += 1;
        record_merged_record(entry.file);

        if let Some((previous, previous_file)) = self.last {
            self.spacing_stats
                .push(timestamp.offset_from(&previous).as_millis_f64());
            if previous_file != entry.file {
                self.file_switches += 1;
            }
        } else {
            self.first = Some(timestamp);
        }
        self.last = Some((timestamp, entry.file));
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let span_ms = match (self.first, self.last) {
            (Some(first), Some((last, _))) => last.offset_from(&first).as_millis_f64(),
            _ => 0.0,
        };
        MetricsSummary {
            total_records: self.total_records,
            files: self.records_per_file.len(),
            span_ms,
            file_switches: self.file_switches,
            spacing_ms: StatsSummary::from(&self.spacing_stats),
            records_per_file: self.records_per_file.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_records: u64,
    pub files: usize,
    pub span_ms: f64,
    pub file_switches: u64,
    pub spacing_ms: StatsSummary,
    pub records_per_file: BTreeMap<FileNumber, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Merge Summary ===")?;
        writeln!(f, "Merged records: {}", self.total_records)?;
        writeln!(f, "Contributing files: {}", self.files)?;
        writeln!(f, "Aligned span (ms): {:.3}", self.span_ms)?;
        writeln!(f, "File switches: {}", self.file_switches)?;
        writeln!(f, "Record spacing (ms): {}", self.spacing_ms)?;

        if !self.records_per_file.is_empty() {
            writeln!(f, "Records per file:")?;
            for (file, count) in &self.records_per_file {
                writeln!(f, "  {}: {}", file, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
