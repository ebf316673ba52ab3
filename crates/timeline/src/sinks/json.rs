//! JsonSink - merged records as JSON lines

use std::io::{self, Write};

use contracts::{MergedRecord, TimelineSink, WeaverError};
use tracing::{debug, instrument};

/// Sink that writes each merged record as one JSON object per line
pub struct JsonSink<W: Write> {
    name: String,
    out: W,
    written: u64,
}

impl<W: Write> JsonSink<W> {
    pub fn new(name: impl Into<String>, out: W) -> Self {
        Self {
            name: name.into(),
            out,
            written: 0,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TimelineSink for JsonSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, entry: &MergedRecord) -> Result<(), WeaverError> {
        serde_json::to_writer(&mut self.out, entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    #[instrument(name = "json_sink_flush", skip(self), fields(sink = %self.name))]
    fn flush(&mut self) -> Result<(), WeaverError> {
        self.out.flush()?;
        debug!(sink = %self.name, written = self.written, "json sink flushed");
        Ok(())
    }
}
