//! IndexedTimeline - random access into the merged order
//!
//! One merge pass records `(file, byte position)` for every emitted entry;
//! lookups then seek straight to the record instead of re-merging.

use std::ops::Range;

use contracts::{MergePosition, MergedRecord};
use ingestion::WeaverLogFile;
use tracing::{debug, instrument};

use crate::error::TimelineError;
use crate::merger::TimelineMerger;

/// Merged order of a set of aligned logs
#[derive(Debug, Clone, Default)]
pub struct IndexedTimeline {
    positions: Vec<MergePosition>,
}

impl IndexedTimeline {
    /// Run one merge pass, keeping only record locations
    #[instrument(name = "indexed_timeline_build", skip(files))]
    pub fn build<'a>(
        files: impl IntoIterator<Item = &'a mut WeaverLogFile>,
    ) -> Result<Self, TimelineError> {
        let mut positions = Vec::new();
        for entry in TimelineMerger::new(files)? {
            positions.push(entry?.location());
        }
        debug!(records = positions.len(), "timeline indexed");
        Ok(Self { positions })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Location of the `index`th merged record
    pub fn position(&self, index: usize) -> Option<MergePosition> {
        self.positions.get(index).copied()
    }

    /// Re-read the `index`th merged record from its log
    pub fn get(
        &self,
        files: &mut [WeaverLogFile],
        index: usize,
    ) -> Result<MergedRecord, TimelineError> {
        let location = self.position(index).ok_or(TimelineError::IndexOutOfRange {
            index,
            len: self.len(),
        })?;

        let file = files
            .iter_mut()
            .find(|f| f.number() == location.file)
            .ok_or(TimelineError::UnknownFile {
                file: location.file,
            })?;

        let record =
            file.read_at(location.position, true)?
                .ok_or(TimelineError::MissingRecord {
                    file: location.file,
                    position: location.position,
                })?;

        Ok(MergedRecord {
            index: index as u64,
            file: location.file,
            position: location.position,
            record,
        })
    }

    /// Records in `range`, clamped to the timeline length
    pub fn range(
        &self,
        files: &mut [WeaverLogFile],
        range: Range<usize>,
    ) -> Result<Vec<MergedRecord>, TimelineError> {
        let end = range.end.min(self.len());
        (range.start.min(end)..end)
            .map(|index| self.get(files, index))
            .collect()
    }
}
