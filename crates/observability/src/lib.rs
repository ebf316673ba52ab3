//! # Observability
//!
//! 可观测性模块：Tracing 初始化 + 对齐/合并指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式，输出到 stderr)
//! - `metrics` facade 指标记录（不安装 exporter，批处理工具）
//! - 合并运行的内存聚合与摘要
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init_with_config, ObservabilityConfig, MergeMetricsAggregator};
//!
//! init_with_config(ObservabilityConfig::default())?;
//!
//! let mut aggregator = MergeMetricsAggregator::new();
//! for entry in merger {
//!     aggregator.update(&entry?);
//! }
//! eprintln!("{}", aggregator.summary());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_alignment_outcome, record_effective_offset, record_merged_record, record_outlier,
    record_pair_sample, MergeMetricsAggregator, MetricsSummary, RunningStats, StatsSummary,
};

/// 以默认配置初始化 Tracing
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 默认日志级别 (`RUST_LOG` 优先)
    pub default_log_level: String,
    /// 忽略 `RUST_LOG`，强制使用默认级别
    pub force_level: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            default_log_level: "info".to_string(),
            force_level: false,
        }
    }
}

impl ObservabilityConfig {
    /// 由 `-v` 次数与 `-q` 推导配置
    pub fn from_verbosity(log_format: LogFormat, verbose: u8, quiet: bool) -> Self {
        let default_log_level = if quiet {
            "warn"
        } else {
            match verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };
        Self {
            log_format,
            default_log_level: default_log_level.to_string(),
            force_level: quiet,
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.force_level {
            return EnvFilter::new(&self.default_log_level);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    #[default]
    Compact,
}

/// 使用自定义配置初始化
///
/// 日志写入 stderr，stdout 留给合并输出。
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = config.filter();

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        "Observability initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.default_log_level, "info");
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!(!config.force_level);
    }

    #[test]
    fn test_from_verbosity() {
        assert_eq!(
            ObservabilityConfig::from_verbosity(LogFormat::Json, 0, false).default_log_level,
            "info"
        );
        assert_eq!(
            ObservabilityConfig::from_verbosity(LogFormat::Json, 1, false).default_log_level,
            "debug"
        );
        assert_eq!(
            ObservabilityConfig::from_verbosity(LogFormat::Json, 5, false).default_log_level,
            "trace"
        );

        let quiet = ObservabilityConfig::from_verbosity(LogFormat::Pretty, 2, true);
        assert_eq!(quiet.default_log_level, "warn");
        assert!(quiet.force_level);
    }
}
