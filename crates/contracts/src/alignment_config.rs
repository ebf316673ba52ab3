//! Alignment configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::{ClockOffset, FileNumber};

/// Default outlier tolerance (milliseconds)
pub const DEFAULT_OUTLIER_TOLERANCE_MS: f64 = 10.0;

/// Alignment engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Maximum |sample - pair average| before a tag is reported as an alias
    #[validate(range(min = 0.0, max = 3_600_000.0))]
    pub outlier_tolerance_ms: f64,

    /// Which timestamps feed the pairwise delta samples
    pub delta_source: DeltaSource,

    /// Order in which the offset propagation visits files
    pub traversal: TraversalOrder,

    /// How effective offsets are derived from the pair statistics
    pub strategy: OffsetStrategy,

    /// What a malformed record means for its file
    pub decode_errors: DecodeErrorPolicy,

    /// Merge reachable files instead of aborting on unreachable ones
    pub exclude_unreachable: bool,

    /// Manual per-file corrections
    pub tweaks: Vec<ManualTweak>,

    /// Force a trace format instead of detecting it from the extension
    pub format: Option<TraceFormat>,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            outlier_tolerance_ms: DEFAULT_OUTLIER_TOLERANCE_MS,
            delta_source: DeltaSource::default(),
            traversal: TraversalOrder::default(),
            strategy: OffsetStrategy::default(),
            decode_errors: DecodeErrorPolicy::default(),
            exclude_unreachable: false,
            tweaks: Vec::new(),
            format: None,
        }
    }
}

impl AlignmentConfig {
    /// Tolerance as a clock offset
    pub fn outlier_tolerance(&self) -> ClockOffset {
        ClockOffset::from_secs_f64(self.outlier_tolerance_ms / 1000.0)
    }

    /// Sum of the tweaks configured for `file`
    pub fn tweak_for(&self, file: FileNumber) -> ClockOffset {
        self.tweaks
            .iter()
            .filter(|t| t.file == file)
            .fold(ClockOffset::ZERO, |acc, t| acc + t.offset())
    }
}

/// Source of the pairwise delta samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaSource {
    /// Difference of the two files' first-record timestamps
    #[default]
    FirstRecord,
    /// Difference of the matched tagged records' own timestamps
    MatchedRecord,
}

/// Traversal policy for offset propagation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalOrder {
    /// Continue from each newly offset file before its siblings
    #[default]
    DepthFirst,
    /// Offset every neighbour of a file before moving on
    BreadthFirst,
}

/// Offset derivation strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetStrategy {
    /// First path from the anchor wins
    #[default]
    SinglePath,
    /// Weighted least-squares fit over every pair average
    LeastSquares,
}

/// Policy for undecodable records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorPolicy {
    /// Stop reading that file, keep what was decoded
    #[default]
    TreatAsEof,
    /// Abort the run
    Fail,
}

/// On-disk trace encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceFormat {
    /// One JSON record per line
    JsonLines,
    /// Back-to-back bincode records
    Bincode,
}

impl TraceFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jsonl" | "json" | "ndjson" => Some(Self::JsonLines),
            "bin" | "wtr" => Some(Self::Bincode),
            _ => None,
        }
    }
}

/// Manual correction `file/micros`, added to a file's effective offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTweak {
    pub file: FileNumber,
    pub micros: i64,
}

impl ManualTweak {
    pub fn offset(&self) -> ClockOffset {
        ClockOffset::from_micros(self.micros)
    }
}

impl FromStr for ManualTweak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (file, micros) = s
            .split_once('/')
            .ok_or_else(|| format!("expected FILE/MICROS, got '{s}'"))?;
        let file = file
            .parse::<FileNumber>()
            .map_err(|e| format!("bad file number '{file}': {e}"))?;
        let micros = micros
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("bad microseconds '{micros}': {e}"))?;
        Ok(Self { file, micros })
    }
}

impl fmt::Display for ManualTweak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.file.get(), self.micros)
    }
}
