//! OffsetEstimator - pairwise clock statistics from shared sync tags
//!
//! Every time a tag shows up in a file that already saw it elsewhere, the new
//! occurrence is paired with each earlier one. A pair contributes one delta
//! sample to `(A, B)` and its negation to `(B, A)`, plus a vote on which of
//! the two files' histories reaches further back before the shared event.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{ClockOffset, DeltaSource, FileNumber};
use ingestion::{SyncEvidenceSink, SyncObservation};
use tracing::trace;

use crate::registry::{SyncTagRegistry, TagOccurrence};

/// Accumulated samples for one ordered file pair `(A, B)`.
///
/// Deltas are `A - B` in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairStats {
    pub sample_count: u64,
    pub sum_of_deltas: f64,
    pub sum_of_squared_deltas: f64,
    /// Samples where A's history reached further back than B's
    pub a_stretches_back_farther: u64,
    /// Samples where B's history reached further back than A's
    pub b_stretches_back_farther: u64,
}

impl PairStats {
    pub fn push(&mut self, delta_secs: f64) {
        self.sample_count += 1;
        self.sum_of_deltas += delta_secs;
        self.sum_of_squared_deltas += delta_secs * delta_secs;
    }

    #[inline]
    pub fn is_populated(&self) -> bool {
        self.sample_count > 0
    }

    /// Mean delta in seconds
    pub fn average(&self) -> Option<f64> {
        self.is_populated()
            .then(|| self.sum_of_deltas / self.sample_count as f64)
    }

    /// Population variance in seconds²
    pub fn variance(&self) -> Option<f64> {
        let average = self.average()?;
        let variance = self.sum_of_squared_deltas / self.sample_count as f64 - average * average;
        // Cancellation can leave a tiny negative residue
        Some(variance.max(0.0))
    }

    pub fn average_offset(&self) -> Option<ClockOffset> {
        self.average().map(ClockOffset::from_secs_f64)
    }
}

/// Statistics for every ordered pair that shared at least one tag
#[derive(Debug, Clone, Default)]
pub struct PairTable {
    pairs: BTreeMap<(FileNumber, FileNumber), PairStats>,
}

impl PairTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, a: FileNumber, b: FileNumber) -> Option<&PairStats> {
        self.pairs.get(&(a, b))
    }

    pub fn get_mut(&mut self, a: FileNumber, b: FileNumber) -> &mut PairStats {
        self.pairs.entry((a, b)).or_default()
    }

    pub fn insert(&mut self, a: FileNumber, b: FileNumber, stats: PairStats) {
        self.pairs.insert((a, b), stats);
    }

    /// Whether `(a, b)` has at least one sample
    pub fn linked(&self, a: FileNumber, b: FileNumber) -> bool {
        self.get(a, b).is_some_and(PairStats::is_populated)
    }

    /// Populated pairs `(a, _)`, ascending by the second file
    pub fn pairs_from(&self, a: FileNumber) -> impl Iterator<Item = (FileNumber, &PairStats)> + '_ {
        self.pairs
            .range((a, FileNumber::new(0))..=(a, FileNumber::new(u16::MAX)))
            .filter(|(_, stats)| stats.is_populated())
            .map(|((_, b), stats)| (*b, stats))
    }

    /// Every populated ordered pair, ascending
    pub fn iter(&self) -> impl Iterator<Item = ((FileNumber, FileNumber), &PairStats)> + '_ {
        self.pairs
            .iter()
            .filter(|(_, stats)| stats.is_populated())
            .map(|(key, stats)| (*key, stats))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Files appearing in any populated pair
    pub fn files(&self) -> BTreeSet<FileNumber> {
        self.iter().flat_map(|((a, b), _)| [a, b]).collect()
    }
}

/// Consumes the evidence pass and builds the pair table
#[derive(Debug, Clone)]
pub struct OffsetEstimator {
    delta_source: DeltaSource,
    registry: SyncTagRegistry,
    table: PairTable,
    observations: u64,
}

impl OffsetEstimator {
    pub fn new(delta_source: DeltaSource) -> Self {
        Self {
            delta_source,
            registry: SyncTagRegistry::new(),
            table: PairTable::new(),
            observations: 0,
        }
    }

    pub fn delta_source(&self) -> DeltaSource {
        self.delta_source
    }

    /// Delta sample `A - B` for two occurrences of one tag
    pub fn delta(&self, a: &TagOccurrence, b: &TagOccurrence) -> ClockOffset {
        match self.delta_source {
            DeltaSource::FirstRecord => a.file_first.offset_from(&b.file_first),
            DeltaSource::MatchedRecord => a.timestamp.offset_from(&b.timestamp),
        }
    }

    pub fn registry(&self) -> &SyncTagRegistry {
        &self.registry
    }

    pub fn table(&self) -> &PairTable {
        &self.table
    }

    pub fn pair_stats(&self, a: FileNumber, b: FileNumber) -> Option<&PairStats> {
        self.table.get(a, b)
    }

    /// Tagged records observed so far
    pub fn observations(&self) -> u64 {
        self.observations
    }

    fn accumulate(&mut self, tag: u32, a: &TagOccurrence, b: &TagOccurrence) {
        let delta = self.delta(a, b);
        let stretch_a = a.stretch_back();
        let stretch_b = b.stretch_back();
        let a_farther = stretch_a > stretch_b;
        let b_farther = stretch_b > stretch_a;
        let secs = delta.as_secs_f64();

        let forward = self.table.get_mut(a.file, b.file);
        forward.push(secs);
        forward.a_stretches_back_farther += u64::from(a_farther);
        forward.b_stretches_back_farther += u64::from(b_farther);

        let backward = self.table.get_mut(b.file, a.file);
        backward.push(-secs);
        backward.a_stretches_back_farther += u64::from(b_farther);
        backward.b_stretches_back_farther += u64::from(a_farther);

        observability::record_pair_sample(delta);
        trace!(tag, a = %a.file, b = %b.file, %delta, %stretch_a, %stretch_b, "pair sample");
    }
}

impl SyncEvidenceSink for OffsetEstimator {
    fn observe(&mut self, observation: SyncObservation) {
        self.observations += 1;
        let tag = observation.tag.key();
        let occurrence = TagOccurrence::from(&observation);
        for earlier in self.registry.register(tag, occurrence) {
            self.accumulate(tag, &occurrence, &earlier);
        }
    }
}
