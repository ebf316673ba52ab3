//! TraceWriter - produces trace logs in either format

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use contracts::{TraceFormat, TraceRecord, WeaverError};

use crate::codec::{codec_for, RecordCodec};

/// Sequential trace log writer
pub struct TraceWriter {
    codec: Box<dyn RecordCodec>,
    out: BufWriter<File>,
    written: u64,
}

impl TraceWriter {
    /// Create (truncate) a log; format defaults to the extension's
    pub fn create(path: &Path, format: Option<TraceFormat>) -> Result<Self, WeaverError> {
        let format = format
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(TraceFormat::from_extension)
            })
            .unwrap_or(TraceFormat::JsonLines);
        let file = File::create(path).map_err(|e| WeaverError::input(path, e))?;

        Ok(Self {
            codec: codec_for(format),
            out: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn append(&mut self, record: &TraceRecord) -> Result<(), WeaverError> {
        self.codec.encode(&mut self.out, record)?;
        self.written += 1;
        Ok(())
    }

    /// Records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and close
    pub fn finish(mut self) -> Result<u64, WeaverError> {
        self.out.flush()?;
        Ok(self.written)
    }
}
