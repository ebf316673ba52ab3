//! Timeline error types

use contracts::{FileNumber, WeaverError};
use thiserror::Error;

/// Timeline-specific errors
#[derive(Debug, Error)]
pub enum TimelineError {
    /// Index lookup past the end of the merged timeline
    #[error("merged index {index} out of range (timeline has {len} records)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Indexed position points at a log that was not supplied
    #[error("{file} is not part of this timeline")]
    UnknownFile { file: FileNumber },

    /// Indexed position no longer decodes to a record
    #[error("no record at byte {position} of {file}")]
    MissingRecord { file: FileNumber, position: u64 },

    /// Error from the log layer
    #[error(transparent)]
    Weaver(#[from] WeaverError),
}

impl From<TimelineError> for WeaverError {
    fn from(err: TimelineError) -> Self {
        match err {
            TimelineError::Weaver(inner) => inner,
            other => WeaverError::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_weaver_error() {
        let err: WeaverError = TimelineError::Weaver(WeaverError::OffsetUnassigned {
            file: FileNumber::new(1),
        })
        .into();
        assert!(matches!(err, WeaverError::OffsetUnassigned { .. }));

        let err: WeaverError = TimelineError::IndexOutOfRange { index: 5, len: 2 }.into();
        assert!(err.to_string().contains("out of range"));
    }
}
