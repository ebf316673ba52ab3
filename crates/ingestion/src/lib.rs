//! # Ingestion
//!
//! Trace log decoding.
//!
//! Responsibilities:
//! - Open trace logs and number them by input order
//! - Decode records sequentially (JSON lines or bincode) with byte positions
//! - Evidence pass: hand every tagged record to a [`SyncEvidenceSink`]
//! - Merge pass: read records translated by the file's effective offset
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{OpenOptions, WeaverLogFile};
//!
//! let mut log = WeaverLogFile::open(FileNumber::new(0), "tile-0.jsonl", OpenOptions::default())?;
//! let mut evidence = Vec::new();
//! log.collect_sync_evidence(&mut evidence)?;
//!
//! log.set_effective_offset(ClockOffset::ZERO)?;
//! while let Some(record) = log.read(true)? {
//!     // Record on the shared time axis
//! }
//! ```

mod codec;
mod error;
mod evidence;
mod log_file;
mod stats;
mod writer;

// Re-exports
pub use codec::{codec_for, BincodeCodec, JsonLinesCodec, RecordCodec};
pub use contracts::TraceRecord;
pub use error::{CodecError, CodecResult};
pub use evidence::{SyncEvidenceSink, SyncObservation};
pub use log_file::{open_logs, EvidenceScan, OpenOptions, WeaverLogFile};
pub use stats::LogFileStats;
pub use writer::TraceWriter;
