//! DumpSink - one text line per merged record
//!
//! `mergedIndex timestamp fileNumber address payload`

use std::io::Write;

use chrono::DateTime;
use contracts::{MergedRecord, TimelineSink, UniqueTime, WeaverError};
use tracing::{debug, instrument};

/// How timestamps are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampStyle {
    /// `seconds.nanos#uniquer`
    #[default]
    Raw,
    /// RFC 3339 UTC with nanoseconds, uniquer appended
    Utc,
}

impl TimestampStyle {
    pub fn render(&self, timestamp: &UniqueTime) -> String {
        match self {
            Self::Raw => timestamp.to_string(),
            Self::Utc => match DateTime::from_timestamp(timestamp.seconds, timestamp.nanos) {
                Some(utc) => format!(
                    "{}#{}",
                    utc.format("%Y-%m-%dT%H:%M:%S%.9fZ"),
                    timestamp.uniquer
                ),
                // Outside chrono's range
                None => timestamp.to_string(),
            },
        }
    }
}

/// Render one dump line (without newline)
pub fn format_entry(entry: &MergedRecord, style: TimestampStyle) -> String {
    format!(
        "{:>8} {} {} {} {}",
        entry.index,
        style.render(&entry.record.timestamp),
        entry.file.get(),
        entry.record.address,
        entry.record.payload_pretty()
    )
}

/// Sink that prints the merged timeline as text
pub struct DumpSink<W: Write> {
    name: String,
    out: W,
    style: TimestampStyle,
    lines: u64,
}

impl<W: Write> DumpSink<W> {
    pub fn new(name: impl Into<String>, out: W, style: TimestampStyle) -> Self {
        Self {
            name: name.into(),
            out,
            style,
            lines: 0,
        }
    }

    /// Lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TimelineSink for DumpSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, entry: &MergedRecord) -> Result<(), WeaverError> {
        writeln!(self.out, "{}", format_entry(entry, self.style))?;
        self.lines += 1;
        Ok(())
    }

    #[instrument(name = "dump_sink_flush", skip(self), fields(sink = %self.name))]
    fn flush(&mut self) -> Result<(), WeaverError> {
        self.out.flush()?;
        debug!(sink = %self.name, lines = self.lines, "dump flushed");
        Ok(())
    }
}
