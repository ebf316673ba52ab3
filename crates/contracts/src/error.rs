//! Layered error definitions
//!
//! Categorized by source: config / input / time / alignment

use std::path::PathBuf;

use thiserror::Error;

use crate::{ClockOffset, FileNumber, UniqueTime};

/// Unified error type
#[derive(Debug, Error)]
pub enum WeaverError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Input Errors =====
    /// Trace file missing or unreadable
    #[error("cannot open trace log '{}': {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Trace file became unreadable mid-run
    #[error("read error in {file} ('{}'): {source}", path.display())]
    Read {
        file: FileNumber,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed record
    #[error("decode error in {file} at byte {position}: {message}")]
    Decode {
        file: FileNumber,
        position: u64,
        message: String,
    },

    // ===== Time Errors =====
    /// Subtraction with operands out of order
    #[error("ordering violation: cannot subtract {subtrahend} from earlier {minuend}")]
    OrderingViolation {
        minuend: UniqueTime,
        subtrahend: UniqueTime,
    },

    /// Aligned read before the aligner ran
    #[error("{file} has no effective offset yet")]
    OffsetUnassigned { file: FileNumber },

    /// Effective offsets are write-once
    #[error("{file} already has effective offset {existing}")]
    OffsetAlreadyAssigned {
        file: FileNumber,
        existing: ClockOffset,
    },

    // ===== Alignment Errors =====
    /// Zero or several anchor candidates
    #[error("cannot choose time origin: {} anchor candidates {candidates:?}", candidates.len())]
    AlignmentAmbiguity { candidates: Vec<FileNumber> },

    /// Files without a chain of shared sync tags back to the anchor
    #[error("no sync evidence links {} file(s) to anchor {anchor}: {}", files.len(), describe_files(files))]
    UnreachableFile {
        anchor: FileNumber,
        files: Vec<(FileNumber, PathBuf)>,
    },

    /// Sync samples disagreeing with the pair average
    #[error("{count} sync tag sample(s) exceed the {tolerance_ms}ms tolerance (first: tag {first_tag} between {first_pair:?})")]
    SyncAnomaly {
        count: usize,
        tolerance_ms: f64,
        first_tag: u32,
        first_pair: (FileNumber, FileNumber),
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

fn describe_files(files: &[(FileNumber, PathBuf)]) -> String {
    files
        .iter()
        .map(|(number, path)| format!("{number} ({})", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl WeaverError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create input error for a trace path
    pub fn input(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Input {
            path: path.into(),
            source,
        }
    }

    /// Create read error for an opened trace log
    pub fn read(file: FileNumber, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            file,
            path: path.into(),
            source,
        }
    }

    /// Create decode error
    pub fn decode(file: FileNumber, position: u64, message: impl Into<String>) -> Self {
        Self::Decode {
            file,
            position,
            message: message.into(),
        }
    }

    /// True for conditions that abort an alignment run
    pub fn is_alignment_failure(&self) -> bool {
        matches!(
            self,
            Self::AlignmentAmbiguity { .. } | Self::UnreachableFile { .. } | Self::SyncAnomaly { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WeaverError>;
