//! Human-readable summary of one alignment

use std::fmt;
use std::path::PathBuf;

use contracts::{ClockOffset, FileNumber, UniqueTime};

/// Per-file outcome
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub file: FileNumber,
    pub path: PathBuf,
    pub first_timestamp: Option<UniqueTime>,
    pub offset: Option<ClockOffset>,
    pub tweak: ClockOffset,
    pub derived_from: Option<FileNumber>,
    pub tagged_records: u64,
    pub excluded: bool,
}

/// Statistics of one ordered file pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    pub a: FileNumber,
    pub b: FileNumber,
    pub samples: u64,
    /// Seconds
    pub average: f64,
    /// Seconds²
    pub variance: f64,
    pub a_farther: u64,
    pub b_farther: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentReport {
    pub anchor: FileNumber,
    pub files: Vec<FileReport>,
    pub pairs: Vec<PairReport>,
    pub outliers: usize,
}

impl fmt::Display for AlignmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Alignment ===")?;
        writeln!(f, "Time origin: {}", self.anchor)?;
        writeln!(f, "Files:")?;
        for file in &self.files {
            let offset = file
                .offset
                .map(|o| o.to_string())
                .unwrap_or_else(|| "-".to_string());
            let first = file
                .first_timestamp
                .map(|t| t.to_string())
                .unwrap_or_else(|| "(empty)".to_string());
            write!(
                f,
                "  {} {} first={} offset={} tags={}",
                file.file,
                file.path.display(),
                first,
                offset,
                file.tagged_records
            )?;
            if file.tweak != ClockOffset::ZERO {
                write!(f, " tweak={}", file.tweak)?;
            }
            if let Some(via) = file.derived_from {
                write!(f, " via={via}")?;
            }
            if file.excluded {
                write!(f, " EXCLUDED")?;
            }
            writeln!(f)?;
        }

        if !self.pairs.is_empty() {
            writeln!(f, "Pairs:")?;
            for pair in &self.pairs {
                writeln!(
                    f,
                    "  {} - {}: n={} avg={:+.9}s var={:.3e} farther(a/b)={}/{}",
                    pair.a,
                    pair.b,
                    pair.samples,
                    pair.average,
                    pair.variance,
                    pair.a_farther,
                    pair.b_farther
                )?;
            }
        }
        if self.outliers > 0 {
            writeln!(f, "Outliers: {}", self.outliers)?;
        }
        Ok(())
    }
}
