//! Record codecs
//!
//! A codec turns the bytes at the reader's position into one [`TraceRecord`]
//! and reports how many bytes it consumed, so the log file can keep exact
//! byte positions for the merge index.

use std::io::{self, BufRead, Read, Write};

use contracts::{TraceFormat, TraceRecord};

use crate::error::{CodecError, CodecResult};

/// Sequential record decoder / encoder for one trace format
pub trait RecordCodec: Send {
    /// Codec name (used for logging)
    fn name(&self) -> &'static str;

    /// Decode the record at the reader's position.
    ///
    /// Returns `Ok(None)` at a clean end of file, otherwise the record and
    /// the number of bytes it occupied.
    fn decode(&mut self, reader: &mut dyn BufRead) -> CodecResult<Option<(TraceRecord, u64)>>;

    /// Append one record
    fn encode(&self, writer: &mut dyn Write, record: &TraceRecord) -> io::Result<()>;
}

/// Create the codec for a format
pub fn codec_for(format: TraceFormat) -> Box<dyn RecordCodec> {
    match format {
        TraceFormat::JsonLines => Box::new(JsonLinesCodec::default()),
        TraceFormat::Bincode => Box::new(BincodeCodec),
    }
}

/// One JSON object per line; blank lines are skipped
#[derive(Debug, Default)]
pub struct JsonLinesCodec {
    line: Vec<u8>,
}

impl RecordCodec for JsonLinesCodec {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn decode(&mut self, reader: &mut dyn BufRead) -> CodecResult<Option<(TraceRecord, u64)>> {
        let mut consumed = 0u64;
        loop {
            self.line.clear();
            let n = reader.read_until(b'\n', &mut self.line)?;
            if n == 0 {
                return Ok(None);
            }
            consumed += n as u64;

            // Bytes, not str: invalid UTF-8 is a malformed record
            let text = self.line.trim_ascii();
            if text.is_empty() {
                continue;
            }

            let record = serde_json::from_slice(text).map_err(CodecError::malformed)?;
            return Ok(Some((record, consumed)));
        }
    }

    fn encode(&self, writer: &mut dyn Write, record: &TraceRecord) -> io::Result<()> {
        serde_json::to_writer(&mut *writer, record).map_err(io::Error::other)?;
        writer.write_all(b"\n")
    }
}

/// Back-to-back bincode records
#[derive(Debug, Default)]
pub struct BincodeCodec;

/// Counts bytes pulled through by the bincode deserializer
struct CountingReader<'a> {
    inner: &'a mut dyn BufRead,
    count: u64,
}

impl Read for CountingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

impl RecordCodec for BincodeCodec {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn decode(&mut self, reader: &mut dyn BufRead) -> CodecResult<Option<(TraceRecord, u64)>> {
        if reader.fill_buf()?.is_empty() {
            return Ok(None);
        }

        let mut counting = CountingReader {
            inner: reader,
            count: 0,
        };
        let record: TraceRecord =
            bincode::deserialize_from(&mut counting).map_err(CodecError::malformed)?;
        Ok(Some((record, counting.count)))
    }

    fn encode(&self, writer: &mut dyn Write, record: &TraceRecord) -> io::Result<()> {
        bincode::serialize_into(writer, record).map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Address, Direction, TypeCode, UniqueTime};
    use std::io::Cursor;

    fn sample(seconds: i64, tag: i32) -> TraceRecord {
        TraceRecord::new(
            UniqueTime::new(seconds, 10, 0),
            TypeCode::ItcState,
            Address::Itc(Direction::Sw),
        )
        .with_sync_tag(tag)
        .with_payload(vec![1, 2, 3])
    }

    fn encode_all(format: TraceFormat, records: &[TraceRecord]) -> Vec<u8> {
        let codec = codec_for(format);
        let mut out = Vec::new();
        for record in records {
            codec.encode(&mut out, record).unwrap();
        }
        out
    }

    #[test]
    fn test_consumed_bytes_sum_to_stream_length() {
        for format in [TraceFormat::JsonLines, TraceFormat::Bincode] {
            let records = vec![sample(1, 0), sample(2, 5), sample(3, -5)];
            let bytes = encode_all(format, &records);
            let mut codec = codec_for(format);
            let mut cursor = Cursor::new(bytes.clone());

            let mut total = 0;
            let mut decoded = Vec::new();
            while let Some((record, n)) = codec.decode(&mut cursor).unwrap() {
                total += n;
                decoded.push(record);
            }

            assert_eq!(total, bytes.len() as u64, "{}", codec.name());
            assert_eq!(decoded, records);
        }
    }

    #[test]
    fn test_jsonl_skips_blank_lines() {
        let mut bytes = b"\n\n".to_vec();
        bytes.extend(encode_all(TraceFormat::JsonLines, &[sample(1, 0)]));
        let mut codec = JsonLinesCodec::default();
        let (_, consumed) = codec.decode(&mut Cursor::new(bytes.clone())).unwrap().unwrap();
        assert_eq!(consumed, bytes.len() as u64);
    }

    #[test]
    fn test_jsonl_malformed_line() {
        let mut codec = JsonLinesCodec::default();
        let err = codec
            .decode(&mut Cursor::new(b"{not json}\n".to_vec()))
            .unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn test_jsonl_invalid_utf8_is_malformed() {
        let mut bytes = encode_all(TraceFormat::JsonLines, &[sample(1, 0)]);
        let first_len = bytes.len() as u64;
        bytes.extend_from_slice(b"\xff\xfe garbage\n");

        let mut codec = JsonLinesCodec::default();
        let mut cursor = Cursor::new(bytes);
        let (_, consumed) = codec.decode(&mut cursor).unwrap().unwrap();
        assert_eq!(consumed, first_len);
        let err = codec.decode(&mut cursor).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn test_bincode_truncated_record() {
        let bytes = encode_all(TraceFormat::Bincode, &[sample(1, 3)]);
        let truncated = bytes[..bytes.len() - 2].to_vec();
        let mut codec = BincodeCodec;
        let err = codec.decode(&mut Cursor::new(truncated)).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }
}
