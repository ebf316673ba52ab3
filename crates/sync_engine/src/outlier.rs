//! OutlierReporter - samples that disagree with their pair average
//!
//! A tag reused for unrelated events (an alias) produces a delta far from the
//! average of its file pair. Every sample is re-derived and compared against
//! the finished statistics.

use contracts::{ClockOffset, FileNumber, WeaverError};
use tracing::{instrument, warn};

use crate::estimator::OffsetEstimator;

/// One suspicious sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutlier {
    pub tag: u32,
    pub file_a: FileNumber,
    pub file_b: FileNumber,
    pub position_a: u64,
    pub position_b: u64,
    pub delta: ClockOffset,
    pub average: ClockOffset,
}

impl SyncOutlier {
    /// `delta - average`
    pub fn deviation(&self) -> ClockOffset {
        self.delta - self.average
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutlierReporter {
    tolerance: ClockOffset,
}

impl OutlierReporter {
    pub fn new(tolerance: ClockOffset) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> ClockOffset {
        self.tolerance
    }

    /// Check every ordered occurrence pair of every shared tag
    #[instrument(name = "outlier_reporter_inspect", skip_all, fields(tolerance = %self.tolerance))]
    pub fn inspect(&self, estimator: &OffsetEstimator) -> Vec<SyncOutlier> {
        let limit = self.tolerance.as_nanos().unsigned_abs();
        let mut outliers = Vec::new();

        for (tag, occurrences) in estimator.registry().iter() {
            for a in occurrences {
                for b in occurrences.iter().filter(|b| b.file != a.file) {
                    let Some(average) = estimator
                        .pair_stats(a.file, b.file)
                        .and_then(|stats| stats.average_offset())
                    else {
                        continue;
                    };

                    let delta = estimator.delta(a, b);
                    let outlier = SyncOutlier {
                        tag,
                        file_a: a.file,
                        file_b: b.file,
                        position_a: a.position,
                        position_b: b.position,
                        delta,
                        average,
                    };
                    if outlier.deviation().as_nanos().unsigned_abs() > limit {
                        warn!(
                            tag,
                            file_a = %a.file,
                            file_b = %b.file,
                            %delta,
                            %average,
                            "possible tag alias"
                        );
                        observability::record_outlier(tag, outlier.deviation());
                        outliers.push(outlier);
                    }
                }
            }
        }

        outliers
    }

    /// The abort error for a non-empty outlier list
    pub fn anomaly(&self, outliers: &[SyncOutlier]) -> Option<WeaverError> {
        let first = outliers.first()?;
        Some(WeaverError::SyncAnomaly {
            count: outliers.len(),
            tolerance_ms: self.tolerance.as_millis_f64(),
            first_tag: first.tag,
            first_pair: (first.file_a, first.file_b),
        })
    }
}
