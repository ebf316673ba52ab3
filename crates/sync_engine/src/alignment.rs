//! Alignment - one run from trace paths to an aligned, mergeable corpus
//!
//! Order of work: evidence pass over every log, outlier check, anchor and
//! offsets, then merge in batch or indexed mode.

use std::path::Path;

use contracts::{AlignmentConfig, FileNumber, TimelineSink, WeaverError};
use ingestion::{open_logs, OpenOptions, WeaverLogFile};
use timeline::{IndexedTimeline, TimelineMerger};
use tracing::{error, info, instrument};

use crate::aligner::{AlignTarget, Aligner, OffsetAssignment};
use crate::estimator::OffsetEstimator;
use crate::outlier::{OutlierReporter, SyncOutlier};
use crate::registry::TagUsage;
use crate::report::{AlignmentReport, FileReport, PairReport};

/// Owns the logs of one run and the state derived from them
#[derive(Debug)]
pub struct Alignment {
    config: AlignmentConfig,
    files: Vec<WeaverLogFile>,
    estimator: Option<OffsetEstimator>,
    outliers: Vec<SyncOutlier>,
    assignment: Option<OffsetAssignment>,
    excluded: Vec<FileNumber>,
}

impl Alignment {
    /// Open every trace log, numbering them by position in `paths`
    ///
    /// # Errors
    /// - `Input` naming the first path that cannot be opened
    #[instrument(name = "alignment_open", skip_all, fields(files = paths.len()))]
    pub fn open<P: AsRef<Path>>(paths: &[P], config: AlignmentConfig) -> Result<Self, WeaverError> {
        let files = open_logs(paths, |number| OpenOptions {
            format: config.format,
            decode_errors: config.decode_errors,
            manual_tweak: config.tweak_for(number),
        })?;
        Ok(Self::from_files(files, config))
    }

    pub fn from_files(files: Vec<WeaverLogFile>, config: AlignmentConfig) -> Self {
        Self {
            config,
            files,
            estimator: None,
            outliers: Vec::new(),
            assignment: None,
            excluded: Vec::new(),
        }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    pub fn files(&self) -> &[WeaverLogFile] {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut [WeaverLogFile] {
        &mut self.files
    }

    pub fn assignment(&self) -> Option<&OffsetAssignment> {
        self.assignment.as_ref()
    }

    pub fn outliers(&self) -> &[SyncOutlier] {
        &self.outliers
    }

    /// Files left out of the merge under `exclude_unreachable`
    pub fn excluded(&self) -> &[FileNumber] {
        &self.excluded
    }

    /// Evidence pass over every log. Runs once; later calls reuse the result.
    pub fn analyze_log_sync(&mut self) -> Result<&OffsetEstimator, WeaverError> {
        let estimator = self.take_or_collect_evidence()?;
        Ok(self.estimator.insert(estimator))
    }

    /// Tag usage rows for display
    pub fn tag_usage(&mut self) -> Result<Vec<TagUsage>, WeaverError> {
        Ok(self.analyze_log_sync()?.registry().usage_report())
    }

    /// Assign every log its effective offset. Runs once.
    ///
    /// # Errors
    /// - `SyncAnomaly` if any sample deviates beyond the tolerance
    /// - `AlignmentAmbiguity` without a unique time origin
    /// - `UnreachableFile` unless `exclude_unreachable` is set
    #[instrument(name = "alignment_align", skip(self), fields(files = self.files.len()))]
    pub fn align(&mut self) -> Result<&OffsetAssignment, WeaverError> {
        let assignment = match self.assignment.take() {
            Some(assignment) => assignment,
            None => {
                let estimator = self.take_or_collect_evidence()?;
                let result = self.align_with(&estimator);
                self.estimator = Some(estimator);

                let outcome = match &result {
                    Ok(_) => "aligned",
                    Err(err) => outcome_label(err),
                };
                observability::record_alignment_outcome(outcome);
                result?
            }
        };
        Ok(self.assignment.insert(assignment))
    }

    /// Streaming merge over the aligned logs
    pub fn merger(&mut self) -> Result<TimelineMerger<'_>, WeaverError> {
        self.align()?;
        TimelineMerger::new(
            self.files
                .iter_mut()
                .filter(|f| f.effective_offset().is_some()),
        )
    }

    /// Batch mode: align, then drain the merge into `sink`
    pub fn merge_into(&mut self, sink: &mut dyn TimelineSink) -> Result<u64, WeaverError> {
        self.merger()?.merge_into(sink)
    }

    /// Indexed mode: align, then record the merged order
    pub fn build_index(&mut self) -> Result<IndexedTimeline, WeaverError> {
        self.align()?;
        let index = IndexedTimeline::build(
            self.files
                .iter_mut()
                .filter(|f| f.effective_offset().is_some()),
        )?;
        Ok(index)
    }

    /// Summary of the finished alignment
    pub fn report(&self) -> Option<AlignmentReport> {
        let assignment = self.assignment.as_ref()?;
        let estimator = self.estimator.as_ref()?;

        let files = self
            .files
            .iter()
            .map(|file| FileReport {
                file: file.number(),
                path: file.path().to_path_buf(),
                first_timestamp: file.cached_first_timestamp(),
                offset: file.effective_offset(),
                tweak: file.manual_tweak(),
                derived_from: assignment.derived_from.get(&file.number()).copied(),
                tagged_records: file.stats().tagged_records,
                excluded: self.excluded.contains(&file.number()),
            })
            .collect();

        let pairs = estimator
            .table()
            .iter()
            .map(|((a, b), stats)| PairReport {
                a,
                b,
                samples: stats.sample_count,
                average: stats.average().unwrap_or_default(),
                variance: stats.variance().unwrap_or_default(),
                a_farther: stats.a_stretches_back_farther,
                b_farther: stats.b_stretches_back_farther,
            })
            .collect();

        Some(AlignmentReport {
            anchor: assignment.anchor,
            files,
            pairs,
            outliers: self.outliers.len(),
        })
    }

    fn take_or_collect_evidence(&mut self) -> Result<OffsetEstimator, WeaverError> {
        if let Some(estimator) = self.estimator.take() {
            return Ok(estimator);
        }

        let mut estimator = OffsetEstimator::new(self.config.delta_source);
        let mut records = 0;
        for file in &mut self.files {
            records += file.collect_sync_evidence(&mut estimator)?.records;
        }

        info!(
            files = self.files.len(),
            records,
            tagged = estimator.observations(),
            tags = estimator.registry().tag_count(),
            pairs = estimator.table().len(),
            "sync evidence collected"
        );
        Ok(estimator)
    }

    fn align_with(&mut self, estimator: &OffsetEstimator) -> Result<OffsetAssignment, WeaverError> {
        let reporter = OutlierReporter::new(self.config.outlier_tolerance());
        self.outliers = reporter.inspect(estimator);
        if let Some(anomaly) = reporter.anomaly(&self.outliers) {
            return Err(anomaly);
        }

        let targets: Vec<AlignTarget> = self
            .files
            .iter()
            .map(|f| AlignTarget::new(f.number(), f.manual_tweak()))
            .collect();
        let assignment = Aligner::from_config(&self.config).align(&targets, estimator.table())?;

        if !assignment.unreachable.is_empty() {
            if !self.config.exclude_unreachable {
                return Err(WeaverError::UnreachableFile {
                    anchor: assignment.anchor,
                    files: self
                        .files
                        .iter()
                        .filter(|f| assignment.unreachable.contains(&f.number()))
                        .map(|f| (f.number(), f.path().to_path_buf()))
                        .collect(),
                });
            }
            for file in self
                .files
                .iter()
                .filter(|f| assignment.unreachable.contains(&f.number()))
            {
                error!(
                    file = %file.number(),
                    path = %file.path().display(),
                    anchor = %assignment.anchor,
                    "excluded from merge: no sync evidence path to the time origin"
                );
            }
            self.excluded = assignment.unreachable.clone();
        }

        for file in &mut self.files {
            if let Some(offset) = assignment.offset(file.number()) {
                file.set_effective_offset(offset)?;
                observability::record_effective_offset(file.number(), offset);
            }
        }

        info!(
            anchor = %assignment.anchor,
            aligned = assignment.offsets.len(),
            excluded = self.excluded.len(),
            "alignment complete"
        );
        Ok(assignment)
    }
}

fn outcome_label(err: &WeaverError) -> &'static str {
    match err {
        WeaverError::SyncAnomaly { .. } => "sync_anomaly",
        WeaverError::AlignmentAmbiguity { .. } => "ambiguous_origin",
        WeaverError::UnreachableFile { .. } => "unreachable",
        _ => "error",
    }
}
