//! # Timeline
//!
//! 对齐后的多路归并。
//!
//! 负责：
//! - 按对齐时间戳做 k 路归并 (`TimelineMerger`)
//! - 批量输出到 `TimelineSink`
//! - 记录合并位置，支持随机访问 (`IndexedTimeline`)

pub mod error;
pub mod index;
pub mod merger;
pub mod sinks;

pub use contracts::{MergedRecord, TimelineSink};
pub use error::TimelineError;
pub use index::IndexedTimeline;
pub use merger::TimelineMerger;
pub use sinks::{format_entry, DumpSink, JsonSink, TimestampStyle};
