//! Streaming FASTQ parser.
//!
//! Reads 4-line FASTQ records out of an `io::Read` source, growing its
//! internal buffer on demand so that a record of any size can be parsed
//! without ever copying more than once from the I/O buffer into the
//! emitted record. See spec.md §4.6 for the buffer-layout and fill-protocol
//! contract this implements.

use crate::error::{shorten, Error, ErrorKind, Result};
use crate::record::{Builder, RawBuilder, RawRecord, TextBuilder, TextRecord};
use memchr::memchr_iter;
use std::io::Read;
use std::ops::Range;

/// Default initial buffer size, matching `seq_io::core::bufreader::BUFSIZE`.
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// A FASTQ streaming parser parameterized over a [`Builder`] that decides
/// what record type `next()` produces.
///
/// # Buffer layout
///
/// ```text
/// [ leftover ][ readable bytes           ][ free ]
/// 0          record_start                bufend   capacity
/// ```
///
/// `buf[..record_start]` has already been emitted and may be discarded;
/// `buf[record_start..bufend]` holds an in-progress or pending record;
/// `buf[bufend..]` is free. Capacity only ever doubles, and only when the
/// leftover occupies the entire buffer.
pub struct Parser<Rdr, B, R>
where
    Rdr: Read,
    B: Builder<R>,
{
    source: Rdr,
    buf: Vec<u8>,
    record_start: usize,
    bufend: usize,
    record_count: u64,
    eof: bool,
    synthetic_newline: bool,
    poisoned: bool,
    builder: B,
    pending: Option<R>,
    first_header_flag: Option<bool>,
}

impl<Rdr: Read> Parser<Rdr, TextBuilder, TextRecord> {
    /// A parser emitting [`TextRecord`]s (7-bit ASCII validated), with the
    /// default initial buffer capacity.
    #[inline]
    pub fn new(source: Rdr) -> Self {
        Self::with_capacity(source, DEFAULT_CAPACITY)
    }

    #[inline]
    pub fn with_capacity(source: Rdr, capacity: usize) -> Self {
        Self::with_builder(source, capacity, TextBuilder)
    }
}

impl<Rdr: Read> Parser<Rdr, RawBuilder, RawRecord> {
    /// A parser emitting [`RawRecord`]s (opaque bytes, no ASCII check), with
    /// the default initial buffer capacity.
    #[inline]
    pub fn new_raw(source: Rdr) -> Self {
        Self::with_capacity_raw(source, DEFAULT_CAPACITY)
    }

    #[inline]
    pub fn with_capacity_raw(source: Rdr, capacity: usize) -> Self {
        Self::with_builder(source, capacity, RawBuilder)
    }
}

impl<Rdr, B, R> Parser<Rdr, B, R>
where
    Rdr: Read,
    B: Builder<R>,
{
    /// Smallest initial capacity that cannot panic while scanning for four
    /// newlines and a `+`/name-repeat check.
    pub const MIN_CAPACITY: usize = 8;

    /// A parser using a caller-supplied [`Builder`] — the "custom record
    /// class injection" escape hatch from spec.md §9.
    pub fn with_builder(source: Rdr, capacity: usize, builder: B) -> Self {
        assert!(
            capacity >= Self::MIN_CAPACITY,
            "initial buffer capacity too small, should be >= {}",
            Self::MIN_CAPACITY
        );
        Parser {
            source,
            buf: vec![0u8; capacity],
            record_start: 0,
            bufend: 0,
            record_count: 0,
            eof: false,
            synthetic_newline: false,
            poisoned: false,
            builder,
            pending: None,
            first_header_flag: None,
        }
    }

    /// Whether the first record's second header (`+<name-repeat>`) was
    /// non-empty. Forces parsing of the first record (without consuming it
    /// from the iterator) the first time it is called; subsequent calls
    /// return the cached value.
    pub fn first_record_has_second_header(&mut self) -> Result<bool> {
        if let Some(flag) = self.first_header_flag {
            return Ok(flag);
        }
        match self.parse_one() {
            Some(Ok(rec)) => {
                self.pending = Some(rec);
                Ok(self.first_header_flag.unwrap_or(false))
            }
            Some(Err(e)) => Err(e),
            None => {
                self.first_header_flag = Some(false);
                Ok(false)
            }
        }
    }

    fn parse_one(&mut self) -> Option<Result<R>> {
        if self.poisoned {
            return None;
        }
        loop {
            if self.eof {
                return None;
            }
            match find_four_newlines(&self.buf, self.record_start, self.bufend) {
                Some(positions) => match self.extract_record(positions) {
                    Ok(rec) => return Some(Ok(rec)),
                    Err(e) => {
                        self.poisoned = true;
                        return Some(Err(e));
                    }
                },
                None => {
                    if let Err(e) = self.fill() {
                        self.poisoned = true;
                        return Some(Err(e));
                    }
                }
            }
        }
    }

    /// Implements the fill protocol of spec.md §4.6: grow the buffer only
    /// when the leftover already fills it entirely, otherwise shift the
    /// leftover to the start and read into the freed tail. On EOF, either
    /// appends a synthetic trailing newline, fails with a format error for
    /// a truncated trailing record, or marks the stream finished.
    fn fill(&mut self) -> Result<()> {
        let capacity = self.buf.len();
        if self.record_start == 0 && self.bufend == capacity {
            let new_capacity = capacity
                .checked_mul(2)
                .ok_or_else(|| Error::new(ErrorKind::OutOfMemory))?;
            self.buf.resize(new_capacity, 0);
        } else {
            self.buf.copy_within(self.record_start..self.bufend, 0);
            self.bufend -= self.record_start;
            self.record_start = 0;
        }

        let last_read_position = self.bufend;
        let capacity = self.buf.len();
        let n = self.source.read(&mut self.buf[self.bufend..capacity])?;
        self.bufend += n;

        if n == 0 {
            if last_read_position == 0 {
                self.eof = true;
            } else if self.buf[last_read_position - 1] != b'\n' {
                self.buf[last_read_position] = b'\n';
                self.bufend = last_read_position + 1;
                self.synthetic_newline = true;
            } else {
                let newlines = memchr_iter(b'\n', &self.buf[..last_read_position]).count() as u64;
                let mut line = self.record_count * 4 + newlines;
                if self.synthetic_newline {
                    line = line.saturating_sub(1);
                }
                return Err(Error::new(ErrorKind::FastqFormat {
                    line,
                    message: format!(
                        "premature end of input inside record: '{}'",
                        shorten(&self.buf[..last_read_position])
                    ),
                }));
            }
        }
        Ok(())
    }

    fn extract_record(&mut self, positions: [usize; 4]) -> Result<R> {
        let [name_end, sequence_end, second_header_end, qualities_end] = positions;
        let record_start = self.record_start;
        let line_base = self.record_count * 4;

        if self.buf[record_start] != b'@' {
            return Err(Error::new(ErrorKind::FastqFormat {
                line: line_base,
                message: format!(
                    "expected '@' at record start, found '{}' ('{}')",
                    self.buf[record_start] as char,
                    shorten(&self.buf[record_start..name_end])
                ),
            }));
        }
        if self.buf[sequence_end + 1] != b'+' {
            return Err(Error::new(ErrorKind::FastqFormat {
                line: line_base + 2,
                message: format!(
                    "expected '+' separator, found '{}'",
                    self.buf[sequence_end + 1] as char
                ),
            }));
        }

        let name_range = trimmed(record_start + 1, name_end, &self.buf);
        let sequence_range = trimmed(name_end + 1, sequence_end, &self.buf);
        let second_header_range = trimmed(sequence_end + 2, second_header_end, &self.buf);
        let qualities_range = trimmed(second_header_end + 1, qualities_end, &self.buf);

        if !self.buf[second_header_range.clone()].is_empty()
            && self.buf[second_header_range.clone()] != self.buf[name_range.clone()]
        {
            return Err(Error::new(ErrorKind::FastqFormat {
                line: line_base + 2,
                message: format!(
                    "second header '{}' does not match name '{}'",
                    shorten(&self.buf[second_header_range.clone()]),
                    shorten(&self.buf[name_range.clone()])
                ),
            }));
        }
        if qualities_range.len() != sequence_range.len() {
            return Err(Error::new(ErrorKind::FastqFormat {
                line: line_base + 3,
                message: format!(
                    "sequence length {} does not match quality length {} ('{}')",
                    sequence_range.len(),
                    qualities_range.len(),
                    shorten(&self.buf[name_range.clone()])
                ),
            }));
        }

        if self.builder.requires_ascii() && !crate::ascii::is_ascii(&self.buf[record_start..qualities_end])
        {
            return Err(Error::new(ErrorKind::NonAscii { line: line_base }));
        }

        if self.record_count == 0 {
            self.first_header_flag = Some(!second_header_range.is_empty());
        }

        let record = self.builder.build(
            &self.buf[name_range],
            &self.buf[sequence_range],
            Some(&self.buf[qualities_range]),
        )?;

        self.record_start = qualities_end + 1;
        self.record_count += 1;
        Ok(record)
    }
}

impl<Rdr, B, R> Iterator for Parser<Rdr, B, R>
where
    Rdr: Read,
    B: Builder<R>,
{
    type Item = Result<R>;

    fn next(&mut self) -> Option<Result<R>> {
        if let Some(rec) = self.pending.take() {
            return Some(Ok(rec));
        }
        self.parse_one()
    }
}

/// Trims a trailing `\r` from `[start, line_end)` if the line ends `\r\n`.
/// `line_end` is the absolute position of the line's terminating `\n`.
#[inline]
fn trimmed(start: usize, line_end: usize, buf: &[u8]) -> Range<usize> {
    if line_end > start && buf[line_end - 1] == b'\r' {
        start..line_end - 1
    } else {
        start..line_end
    }
}

/// Locates four successive `\n` bytes in `buf[start..end)`, returning their
/// absolute positions, or `None` if fewer than four are present.
#[inline]
fn find_four_newlines(buf: &[u8], start: usize, end: usize) -> Option<[usize; 4]> {
    let mut positions = [0usize; 4];
    let mut pos = start;
    for slot in &mut positions {
        let offset = memchr::memchr(b'\n', &buf[pos..end])?;
        *slot = pos + offset;
        pos += offset + 1;
    }
    Some(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn collect(input: &[u8]) -> (bool, Vec<Result<TextRecord>>) {
        let mut parser = Parser::new(input);
        let flag = parser.first_record_has_second_header().unwrap();
        let records = parser.collect();
        (flag, records)
    }

    #[test]
    fn minimal_record() {
        let (flag, records) = collect(b"@r\nA\n+\nI\n");
        assert!(!flag);
        assert_eq!(records.len(), 1);
        let rec = records[0].as_ref().unwrap();
        assert_eq!(rec.name(), "r");
        assert_eq!(rec.sequence(), "A");
        assert_eq!(rec.qualities(), Some("I"));
    }

    #[test]
    fn two_header_record() {
        let (flag, records) = collect(b"@r\nA\n+r\nI\n");
        assert!(flag);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn crlf_tolerance() {
        let (_, records) = collect(b"@r\r\nAC\r\n+\r\nII\r\n");
        let rec = records[0].as_ref().unwrap();
        assert_eq!(rec.name(), "r");
        assert_eq!(rec.sequence(), "AC");
        assert_eq!(rec.qualities(), Some("II"));
        assert!(!rec.name().contains('\r'));
    }

    #[test]
    fn missing_final_newline() {
        let (_, records) = collect(b"@r\nA\n+\nI");
        assert_eq!(records.len(), 1);
        let rec = records[0].as_ref().unwrap();
        assert_eq!(rec.sequence(), "A");
    }

    #[test]
    fn length_mismatch_reports_line_three() {
        let mut parser = Parser::new(&b"@r\nAC\n+\nI\n"[..]);
        let err = parser.next().unwrap().unwrap_err();
        match err.kind() {
            ErrorKind::FastqFormat { line, .. } => assert_eq!(*line, 3),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn mate_detection_scenarios() {
        use crate::idmatch::ids_match;
        assert!(ids_match(b"read/1 comment", b"read/2 other"));
        assert!(ids_match(b"read.1", b"read.2"));
        assert!(!ids_match(b"readA 1", b"readB 2"));
        assert!(ids_match(b"", b""));
    }

    #[test]
    fn growth_across_small_initial_capacities() {
        let data = b"@read_one\nACGTACGTACGTACGTACGTACGTACGTACGT\n+\nIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIII\n@r2\nAC\n+\nII\n";
        for cap in Parser::<&[u8], TextBuilder, TextRecord>::MIN_CAPACITY..40 {
            let mut parser = Parser::with_capacity(&data[..], cap);
            let recs: Vec<_> = parser.by_ref().collect::<Result<Vec<_>>>().unwrap();
            assert_eq!(recs.len(), 2, "failed at capacity {cap}");
            assert_eq!(recs[0].name(), "read_one");
            assert_eq!(recs[1].name(), "r2");
        }
    }

    #[test]
    fn invalid_start_byte() {
        let mut parser = Parser::new(&b"r\nA\n+\nI\n"[..]);
        let err = parser.next().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FastqFormat { line: 0, .. }));
    }

    #[test]
    fn missing_separator() {
        let mut parser = Parser::new(&b"@r\nA\n~\nI\n"[..]);
        let err = parser.next().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FastqFormat { line: 2, .. }));
    }

    #[test]
    fn mismatched_second_header() {
        let mut parser = Parser::new(&b"@r\nA\n+wrong\nI\n"[..]);
        let err = parser.next().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FastqFormat { line: 2, .. }));
    }

    #[test]
    fn bare_plus_is_always_accepted() {
        let mut parser = Parser::new(&b"@r\nA\n+\nI\n"[..]);
        assert!(parser.next().unwrap().is_ok());
    }

    #[test]
    fn premature_eof_mid_record() {
        let mut parser = Parser::new(&b"@r\nACGT\n+"[..]);
        let err = parser.next().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FastqFormat { .. }));
    }

    #[test]
    fn poisoned_after_error_then_fused() {
        let mut parser = Parser::new(&b"@r\nACGT\n+"[..]);
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    #[test]
    fn non_ascii_rejected_in_textual_variant() {
        let mut parser = Parser::new(&b"@r\n\xC3\xA9CGT\n+\nIIIII\n"[..]);
        let err = parser.next().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NonAscii { line: 0 }));
    }

    #[test]
    fn raw_builder_accepts_non_ascii() {
        let mut parser = Parser::new_raw(&b"@r\n\xC3\xA9CGT\n+\nIIIII\n"[..]);
        let rec = parser.next().unwrap().unwrap();
        assert_eq!(rec.sequence(), b"\xC3\xA9CGT");
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let mut parser = Parser::new(&b""[..]);
        assert!(!parser.first_record_has_second_header().unwrap());
        assert!(parser.next().is_none());
    }

    #[test]
    fn trailing_blank_lines_after_a_record_are_a_truncated_record() {
        let mut parser = Parser::new(&b"@r\nA\n+\nI\n\n\n"[..]);
        let rec = parser.next().unwrap().unwrap();
        assert_eq!(rec.name(), "r");
        let err = parser.next().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FastqFormat { .. }));
    }

    #[test]
    fn round_trip_single_header() {
        let rec = TextRecord::new("r", "ACGT", Some("IIII".to_string())).unwrap();
        let bytes = rec.fastq_bytes(false).unwrap();
        let mut parser = Parser::new(&bytes[..]);
        assert!(!parser.first_record_has_second_header().unwrap());
        let parsed = parser.next().unwrap().unwrap();
        assert_eq!(parsed, rec);
        assert!(parser.next().is_none());
    }

    #[test]
    fn round_trip_two_headers() {
        let rec = TextRecord::new("r", "ACGT", Some("IIII".to_string())).unwrap();
        let bytes = rec.fastq_bytes(true).unwrap();
        let mut parser = Parser::new(&bytes[..]);
        assert!(parser.first_record_has_second_header().unwrap());
        let parsed = parser.next().unwrap().unwrap();
        assert_eq!(parsed, rec);
        assert!(parser.next().is_none());
    }
}
