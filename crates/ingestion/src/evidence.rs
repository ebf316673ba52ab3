//! Sync evidence handed out by the evidence pass

use contracts::{FileNumber, SyncTag, UniqueTime};

/// One tagged record seen during a file's evidence pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncObservation {
    /// File the record came from
    pub file: FileNumber,
    /// That file's first-record timestamp
    pub file_first: UniqueTime,
    /// Tag carried by the record
    pub tag: SyncTag,
    /// Record's local-clock timestamp
    pub timestamp: UniqueTime,
    /// Byte position of the record
    pub position: u64,
}

impl SyncObservation {
    /// How far the file's history reaches back before this record
    pub fn stretch_back(&self) -> contracts::ClockOffset {
        self.timestamp.offset_from(&self.file_first)
    }
}

/// Consumer of sync evidence (the offset estimator)
pub trait SyncEvidenceSink {
    fn observe(&mut self, observation: SyncObservation);
}

impl SyncEvidenceSink for Vec<SyncObservation> {
    fn observe(&mut self, observation: SyncObservation) {
        self.push(observation);
    }
}
