//! Per-file read counters

/// Counters kept by a log file across both passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogFileStats {
    /// Records decoded (both passes, random access included)
    pub records_read: u64,

    /// Tagged records found by the last evidence pass
    pub tagged_records: u64,

    /// Malformed records hit
    pub decode_errors: u64,
}
