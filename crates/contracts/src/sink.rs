//! TimelineSink trait - merged timeline output interface
//!
//! Defines the abstract interface for Sinks.

use crate::{MergedRecord, WeaverError};

/// Merged timeline output trait
///
/// All sink implementations must implement this trait.
pub trait TimelineSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one merged record
    ///
    /// # Errors
    /// Returns write error (should include context)
    fn write(&mut self, entry: &MergedRecord) -> Result<(), WeaverError>;

    /// Flush buffer (if any)
    fn flush(&mut self) -> Result<(), WeaverError>;
}
