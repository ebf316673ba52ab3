//! WeaverLogFile - restartable sequential access to one tile's trace log
//!
//! The file is read twice per run: an evidence pass that hands every tagged
//! record to the offset estimator, then the merge pass that reads records
//! translated onto the shared time axis.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use contracts::{
    ClockOffset, DecodeErrorPolicy, FileNumber, TraceFormat, TraceRecord, UniqueTime, WeaverError,
};
use tracing::{debug, instrument, warn};

use crate::codec::{codec_for, RecordCodec};
use crate::error::CodecError;
use crate::evidence::{SyncEvidenceSink, SyncObservation};
use crate::stats::LogFileStats;

/// Options applied when opening a log
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    /// Force a format instead of detecting it from the extension
    pub format: Option<TraceFormat>,
    /// Policy for malformed records
    pub decode_errors: DecodeErrorPolicy,
    /// Manual correction added when the aligner assigns this file's offset
    pub manual_tweak: ClockOffset,
}

/// Outcome of an evidence pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvidenceScan {
    pub records: u64,
    pub tagged: u64,
}

/// One trace log
pub struct WeaverLogFile {
    number: FileNumber,
    path: PathBuf,
    format: TraceFormat,
    codec: Box<dyn RecordCodec>,
    reader: BufReader<File>,
    position: u64,
    exhausted: bool,
    decode_errors: DecodeErrorPolicy,
    first_scanned: bool,
    first_timestamp: Option<UniqueTime>,
    effective_offset: Option<ClockOffset>,
    manual_tweak: ClockOffset,
    stats: LogFileStats,
}

impl fmt::Debug for WeaverLogFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeaverLogFile")
            .field("number", &self.number)
            .field("path", &self.path)
            .field("format", &self.format)
            .field("position", &self.position)
            .field("effective_offset", &self.effective_offset)
            .finish()
    }
}

impl WeaverLogFile {
    /// Open a trace log
    ///
    /// # Errors
    /// - `Input` when the file cannot be opened
    pub fn open(
        number: FileNumber,
        path: impl AsRef<Path>,
        options: OpenOptions,
    ) -> Result<Self, WeaverError> {
        let path = path.as_ref().to_path_buf();
        let format = options
            .format
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(TraceFormat::from_extension)
            })
            .unwrap_or(TraceFormat::JsonLines);

        let file = File::open(&path).map_err(|e| WeaverError::input(&path, e))?;

        debug!(file = %number, path = %path.display(), ?format, "opened trace log");

        Ok(Self {
            number,
            path,
            format,
            codec: codec_for(format),
            reader: BufReader::new(file),
            position: 0,
            exhausted: false,
            decode_errors: options.decode_errors,
            first_scanned: false,
            first_timestamp: None,
            effective_offset: None,
            manual_tweak: options.manual_tweak,
            stats: LogFileStats::default(),
        })
    }

    #[inline]
    pub fn number(&self) -> FileNumber {
        self.number
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn format(&self) -> TraceFormat {
        self.format
    }

    /// Byte position of the next record
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    pub fn manual_tweak(&self) -> ClockOffset {
        self.manual_tweak
    }

    #[inline]
    pub fn effective_offset(&self) -> Option<ClockOffset> {
        self.effective_offset
    }

    pub fn stats(&self) -> LogFileStats {
        self.stats
    }

    /// Assign the effective offset. Write-once.
    pub fn set_effective_offset(&mut self, offset: ClockOffset) -> Result<(), WeaverError> {
        if let Some(existing) = self.effective_offset {
            return Err(WeaverError::OffsetAlreadyAssigned {
                file: self.number,
                existing,
            });
        }
        debug!(file = %self.number, %offset, "effective offset assigned");
        self.effective_offset = Some(offset);
        Ok(())
    }

    /// Timestamp of the first record, `None` for an empty log.
    ///
    /// Computed once; the read cursor is left where it was.
    pub fn first_timestamp(&mut self) -> Result<Option<UniqueTime>, WeaverError> {
        if self.first_scanned {
            return Ok(self.first_timestamp);
        }

        let saved_position = self.position;
        let saved_exhausted = self.exhausted;

        self.seek_to(0)?;
        let first = self.decode_next()?.map(|(_, record)| record.timestamp);
        self.seek_to(saved_position)?;
        self.exhausted = saved_exhausted;

        self.first_scanned = true;
        self.first_timestamp = first;
        Ok(first)
    }

    /// First timestamp if it has already been probed
    pub fn cached_first_timestamp(&self) -> Option<UniqueTime> {
        self.first_timestamp
    }

    /// Reset the cursor to the start of the file
    pub fn rewind(&mut self) -> Result<(), WeaverError> {
        self.seek_to(0)
    }

    /// Next record; with `apply_offset` its timestamp is moved onto the
    /// shared axis (`local - effective_offset`).
    ///
    /// # Errors
    /// - `OffsetUnassigned` when `apply_offset` is set before alignment
    /// - `Decode` for malformed records under `DecodeErrorPolicy::Fail`
    pub fn read(&mut self, apply_offset: bool) -> Result<Option<TraceRecord>, WeaverError> {
        Ok(self
            .read_positioned(apply_offset)?
            .map(|(_, record)| record))
    }

    /// Like [`read`](Self::read), also returning the record's byte position
    pub fn read_positioned(
        &mut self,
        apply_offset: bool,
    ) -> Result<Option<(u64, TraceRecord)>, WeaverError> {
        let offset = self.required_offset(apply_offset)?;

        let Some((position, mut record)) = self.decode_next()? else {
            return Ok(None);
        };

        if let Some(offset) = offset {
            record.timestamp = record.timestamp.shift_back(offset);
        }
        Ok(Some((position, record)))
    }

    /// Random access to the record starting at `position`.
    ///
    /// Moves the sequential cursor to just after that record.
    pub fn read_at(
        &mut self,
        position: u64,
        apply_offset: bool,
    ) -> Result<Option<TraceRecord>, WeaverError> {
        self.required_offset(apply_offset)?;
        self.seek_to(position)?;
        self.read(apply_offset)
    }

    /// Full pass handing every tagged record to `sink`; rewinds before and
    /// after.
    #[instrument(name = "log_file_collect_evidence", skip(self, sink), fields(file = %self.number))]
    pub fn collect_sync_evidence(
        &mut self,
        sink: &mut dyn SyncEvidenceSink,
    ) -> Result<EvidenceScan, WeaverError> {
        let mut scan = EvidenceScan::default();
        let Some(file_first) = self.first_timestamp()? else {
            debug!(file = %self.number, "empty log, no sync evidence");
            return Ok(scan);
        };

        self.rewind()?;
        while let Some((position, record)) = self.read_positioned(false)? {
            scan.records += 1;
            if let Some(tag) = record.sync_tag() {
                scan.tagged += 1;
                sink.observe(SyncObservation {
                    file: self.number,
                    file_first,
                    tag,
                    timestamp: record.timestamp,
                    position,
                });
            }
        }
        self.rewind()?;

        self.stats.tagged_records = scan.tagged;
        metrics::counter!("weaver_sync_tags_seen_total").increment(scan.tagged);
        debug!(
            file = %self.number,
            records = scan.records,
            tagged = scan.tagged,
            "evidence pass complete"
        );
        Ok(scan)
    }

    fn required_offset(&self, apply_offset: bool) -> Result<Option<ClockOffset>, WeaverError> {
        if !apply_offset {
            return Ok(None);
        }
        self.effective_offset
            .map(Some)
            .ok_or(WeaverError::OffsetUnassigned { file: self.number })
    }

    fn seek_to(&mut self, position: u64) -> Result<(), WeaverError> {
        self.reader
            .seek(SeekFrom::Start(position))
            .map_err(|e| WeaverError::read(self.number, &self.path, e))?;
        self.position = position;
        self.exhausted = false;
        Ok(())
    }

    fn decode_next(&mut self) -> Result<Option<(u64, TraceRecord)>, WeaverError> {
        if self.exhausted {
            return Ok(None);
        }

        let start = self.position;
        match self.codec.decode(&mut self.reader) {
            Ok(Some((record, consumed))) => {
                self.position += consumed;
                self.stats.records_read += 1;
                Ok(Some((start, record)))
            }
            Ok(None) => {
                self.exhausted = true;
                Ok(None)
            }
            Err(CodecError::Io(e)) => Err(WeaverError::read(self.number, &self.path, e)),
            Err(CodecError::Malformed { message }) => {
                self.stats.decode_errors += 1;
                metrics::counter!("weaver_decode_errors_total").increment(1);
                match self.decode_errors {
                    DecodeErrorPolicy::TreatAsEof => {
                        warn!(
                            file = %self.number,
                            path = %self.path.display(),
                            position = start,
                            error = %message,
                            "undecodable record, treating as end of log"
                        );
                        self.exhausted = true;
                        Ok(None)
                    }
                    DecodeErrorPolicy::Fail => {
                        Err(WeaverError::decode(self.number, start, message))
                    }
                }
            }
        }
    }
}

/// Open every path, numbering files by input order
pub fn open_logs<P: AsRef<Path>>(
    paths: &[P],
    mut options_for: impl FnMut(FileNumber) -> OpenOptions,
) -> Result<Vec<WeaverLogFile>, WeaverError> {
    paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let number = FileNumber::try_from(index)
                .map_err(|_| WeaverError::Other(format!("too many trace logs ({index})")))?;
            WeaverLogFile::open(number, path, options_for(number))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TraceWriter;
    use contracts::{Address, TypeCode};
    use std::io::Write;
    use tempfile::TempDir;

    fn record(seconds: i64, tag: i32) -> TraceRecord {
        TraceRecord::new(UniqueTime::new(seconds, 0, 0), TypeCode::ItcState, Address::Tile)
            .with_sync_tag(tag)
    }

    fn write_log(dir: &TempDir, name: &str, records: &[TraceRecord]) -> PathBuf {
        let path = dir.path().join(name);
        let mut writer = TraceWriter::create(&path, None).unwrap();
        for r in records {
            writer.append(r).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    fn open(path: &Path) -> WeaverLogFile {
        WeaverLogFile::open(FileNumber::new(0), path, OpenOptions::default()).unwrap()
    }

    #[test]
    fn test_open_missing_file_reports_path() {
        let err = WeaverLogFile::open(
            FileNumber::new(1),
            "/nonexistent/tile.jsonl",
            OpenOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, WeaverError::Input { .. }));
        assert!(err.to_string().contains("/nonexistent/tile.jsonl"));
    }

    #[test]
    fn test_first_timestamp_cached_and_cursor_kept() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "a.jsonl", &[record(5, 0), record(6, 0), record(7, 0)]);
        let mut log = open(&path);

        assert_eq!(log.read(false).unwrap().unwrap().timestamp.seconds, 5);
        assert_eq!(log.first_timestamp().unwrap(), Some(UniqueTime::new(5, 0, 0)));
        // Cursor untouched by the first-record probe
        assert_eq!(log.read(false).unwrap().unwrap().timestamp.seconds, 6);
    }

    #[test]
    fn test_empty_log() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "empty.jsonl", &[]);
        let mut log = open(&path);
        assert_eq!(log.first_timestamp().unwrap(), None);
        assert!(log.read(false).unwrap().is_none());
    }

    #[test]
    fn test_apply_offset_requires_assignment() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "a.jsonl", &[record(5, 0)]);
        let mut log = open(&path);

        let err = log.read(true).unwrap_err();
        assert!(matches!(err, WeaverError::OffsetUnassigned { .. }));

        log.set_effective_offset(ClockOffset::from_secs_f64(2.0)).unwrap();
        assert_eq!(log.read(true).unwrap().unwrap().timestamp.seconds, 3);
    }

    #[test]
    fn test_offset_is_write_once() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "a.jsonl", &[record(5, 0)]);
        let mut log = open(&path);
        log.set_effective_offset(ClockOffset::ZERO).unwrap();
        let err = log.set_effective_offset(ClockOffset::from_micros(1)).unwrap_err();
        assert!(matches!(err, WeaverError::OffsetAlreadyAssigned { .. }));
        assert_eq!(log.effective_offset(), Some(ClockOffset::ZERO));
    }

    #[test]
    fn test_rewind_keeps_offset_and_first() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "a.bin", &[record(1, 0), record(2, 0)]);
        let mut log = open(&path);
        assert_eq!(log.format(), TraceFormat::Bincode);

        log.first_timestamp().unwrap();
        log.set_effective_offset(ClockOffset::from_secs_f64(1.0)).unwrap();
        while log.read(true).unwrap().is_some() {}

        log.rewind().unwrap();
        assert_eq!(log.position(), 0);
        assert_eq!(log.read(true).unwrap().unwrap().timestamp.seconds, 0);
        assert_eq!(log.first_timestamp().unwrap().unwrap().seconds, 1);
    }

    #[test]
    fn test_read_at_position() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "a.jsonl", &[record(1, 0), record(2, 0), record(3, 0)]);
        let mut log = open(&path);

        let mut positions = Vec::new();
        while let Some((position, _)) = log.read_positioned(false).unwrap() {
            positions.push(position);
        }
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[0], 0);

        let second = log.read_at(positions[1], false).unwrap().unwrap();
        assert_eq!(second.timestamp.seconds, 2);
    }

    #[test]
    fn test_collect_sync_evidence() {
        let dir = TempDir::new().unwrap();
        let path = write_log(
            &dir,
            "a.jsonl",
            &[record(10, 0), record(11, 7), record(12, 0), record(13, -9)],
        );
        let mut log = open(&path);

        let mut seen: Vec<SyncObservation> = Vec::new();
        let scan = log.collect_sync_evidence(&mut seen).unwrap();

        assert_eq!(scan, EvidenceScan { records: 4, tagged: 2 });
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].tag.key(), 7);
        assert_eq!(seen[1].tag.key(), 9);
        assert!(!seen[1].tag.is_originator());
        assert_eq!(seen[0].stretch_back(), ClockOffset::from_secs_f64(1.0));
        assert_eq!(log.position(), 0);
    }

    #[test]
    fn test_malformed_record_treated_as_eof() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "a.jsonl", &[record(1, 0)]);
        {
            let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(b"garbage\n").unwrap();
        }

        let mut log = open(&path);
        assert!(log.read(false).unwrap().is_some());
        assert!(log.read(false).unwrap().is_none());
        assert_eq!(log.stats().decode_errors, 1);
    }

    #[test]
    fn test_invalid_utf8_line_treated_as_eof() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "a.jsonl", &[record(1, 0)]);
        {
            let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(b"\xff\xfe garbage\n").unwrap();
        }

        let mut log = open(&path);
        assert!(log.read(false).unwrap().is_some());
        assert!(log.read(false).unwrap().is_none());
        assert_eq!(log.stats().decode_errors, 1);
    }

    #[test]
    fn test_invalid_utf8_line_fails_with_position_under_strict_policy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, b"\xff\n").unwrap();

        let options = OpenOptions {
            decode_errors: DecodeErrorPolicy::Fail,
            ..Default::default()
        };
        let mut log = WeaverLogFile::open(FileNumber::new(2), &path, options).unwrap();
        let err = log.read(false).unwrap_err();
        assert!(matches!(err, WeaverError::Decode { position: 0, .. }));
        assert!(err.to_string().contains("file#2"));
    }

    #[test]
    fn test_malformed_record_fails_under_strict_policy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, b"garbage\n").unwrap();

        let options = OpenOptions {
            decode_errors: DecodeErrorPolicy::Fail,
            ..Default::default()
        };
        let mut log = WeaverLogFile::open(FileNumber::new(3), &path, options).unwrap();
        let err = log.read(false).unwrap_err();
        assert!(matches!(err, WeaverError::Decode { position: 0, .. }));
    }

    #[test]
    fn test_open_logs_numbers_by_input_order() {
        let dir = TempDir::new().unwrap();
        let a = write_log(&dir, "a.jsonl", &[record(1, 0)]);
        let b = write_log(&dir, "b.jsonl", &[record(1, 0)]);

        let logs = open_logs(&[a, b], |number| OpenOptions {
            manual_tweak: ClockOffset::from_micros(i64::from(number.get()) * 10),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(logs[1].number(), FileNumber::new(1));
        assert_eq!(logs[1].manual_tweak(), ClockOffset::from_micros(10));
    }
}
