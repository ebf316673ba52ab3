//! TimelineMerger - k-way merge of aligned logs
//!
//! Every log contributes one pending record. The merger repeatedly emits the
//! pending record with the smallest aligned timestamp and refills that log's
//! slot, so memory stays at one record per input.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use contracts::{FileNumber, MergedRecord, TimelineSink, TraceRecord, UniqueTime, WeaverError};
use ingestion::WeaverLogFile;
use tracing::{debug, info, instrument};

/// Head record of one log
#[derive(Debug)]
struct Pending {
    timestamp: UniqueTime,
    file: FileNumber,
    slot: usize,
    position: u64,
    record: TraceRecord,
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; ties go to the lower file number
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.file.cmp(&self.file))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

/// Streaming merge over aligned logs.
///
/// Yields `Result<MergedRecord, WeaverError>`; after the first error the
/// iterator is fused.
pub struct TimelineMerger<'a> {
    files: Vec<&'a mut WeaverLogFile>,
    heap: BinaryHeap<Pending>,
    emitted: u64,
    failed: bool,
}

impl<'a> TimelineMerger<'a> {
    /// Rewind every log and prime one pending record per log.
    ///
    /// # Errors
    /// - `OffsetUnassigned` if any log has not been aligned
    #[instrument(name = "timeline_merger_new", skip(files))]
    pub fn new(files: impl IntoIterator<Item = &'a mut WeaverLogFile>) -> Result<Self, WeaverError> {
        let mut files: Vec<&'a mut WeaverLogFile> = files.into_iter().collect();
        let mut heap = BinaryHeap::with_capacity(files.len());

        for (slot, file) in files.iter_mut().enumerate() {
            file.rewind()?;
            if let Some(pending) = fill(file, slot)? {
                heap.push(pending);
            }
        }

        debug!(files = files.len(), primed = heap.len(), "merge primed");

        Ok(Self {
            files,
            heap,
            emitted: 0,
            failed: false,
        })
    }

    /// Records emitted so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Logs that still have records pending
    pub fn active_files(&self) -> usize {
        self.heap.len()
    }

    /// Batch mode: drain the whole merge into `sink`
    #[instrument(name = "timeline_merge_into", skip(self, sink), fields(sink = sink.name()))]
    pub fn merge_into(mut self, sink: &mut dyn TimelineSink) -> Result<u64, WeaverError> {
        for entry in self.by_ref() {
            sink.write(&entry?)?;
        }
        sink.flush()?;

        info!(sink = sink.name(), records = self.emitted, "merge complete");
        Ok(self.emitted)
    }
}

fn fill(file: &mut WeaverLogFile, slot: usize) -> Result<Option<Pending>, WeaverError> {
    Ok(file
        .read_positioned(true)?
        .map(|(position, record)| Pending {
            timestamp: record.timestamp,
            file: file.number(),
            slot,
            position,
            record,
        }))
}

impl Iterator for TimelineMerger<'_> {
    type Item = Result<MergedRecord, WeaverError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let head = self.heap.pop()?;

        match fill(&mut *self.files[head.slot], head.slot) {
            Ok(Some(next)) => self.heap.push(next),
            Ok(None) => debug!(file = %head.file, "log exhausted"),
            Err(err) => {
                self.failed = true;
                return Some(Err(err));
            }
        }

        let entry = MergedRecord {
            index: self.emitted,
            file: head.file,
            position: head.position,
            record: head.record,
        };
        self.emitted += 1;
        Some(Ok(entry))
    }
}
