//! # Sync Engine
//!
//! 多文件时钟对齐引擎。
//!
//! 负责：
//! - 汇总共享 sync tag，得到成对时钟偏差统计
//! - 检出疑似标签别名（离群样本）
//! - 选取时间原点并传播各文件的有效偏移
//! - 驱动对齐后的合并输出
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::Alignment;
//! use timeline::{DumpSink, TimestampStyle};
//!
//! let mut alignment = Alignment::open(&paths, AlignmentConfig::default())?;
//! alignment.align()?;
//!
//! let mut sink = DumpSink::new("dump", std::io::stdout().lock(), TimestampStyle::Raw);
//! alignment.merge_into(&mut sink)?;
//! ```

mod aligner;
mod alignment;
mod estimator;
mod least_squares;
mod outlier;
mod registry;
mod report;

pub use aligner::{AlignTarget, Aligner, OffsetAssignment};
pub use alignment::Alignment;
pub use estimator::{OffsetEstimator, PairStats, PairTable};
pub use outlier::{OutlierReporter, SyncOutlier};
pub use registry::{SyncTagRegistry, TagClass, TagOccurrence, TagUsage};
pub use report::{AlignmentReport, FileReport, PairReport};

// Re-export contracts types
pub use contracts::{
    AlignmentConfig, ClockOffset, DeltaSource, FileNumber, OffsetStrategy, TraversalOrder,
    WeaverError,
};
