//! MergedRecord - TimelineMerger output
//!
//! One entry of the globally ordered timeline.

use serde::{Deserialize, Serialize};

use crate::{FileNumber, TraceRecord};

/// Record placed on the shared time axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRecord {
    /// Position in the merged sequence (monotonically increasing)
    pub index: u64,

    /// Log that produced the record
    pub file: FileNumber,

    /// Byte position of the record inside its log
    pub position: u64,

    /// Record with its timestamp already aligned
    pub record: TraceRecord,
}

/// Where a merged entry lives on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergePosition {
    pub file: FileNumber,
    pub position: u64,
}

impl MergedRecord {
    pub fn location(&self) -> MergePosition {
        MergePosition {
            file: self.file,
            position: self.position,
        }
    }
}
