//! FASTQ record values: construction, slicing, equality, and serialization.
//!
//! Two variants are provided, selected by which constructor (or which
//! [`Builder`]) produced the record: [`RawRecord`] holds opaque byte
//! strings, [`TextRecord`] additionally guarantees 7-bit ASCII text. Both
//! own their fields outright — no record ever borrows from a parser buffer.

use crate::ascii::is_ascii;
use crate::error::{shorten, shorten_to, Error, ErrorKind, Result};
use crate::idmatch::ids_match;
use std::ops::Range;

/// Fields longer than this are elided in the middle by [`RawRecord::repr`]
/// and [`TextRecord::repr`].
const REPR_ELIDE_LIMIT: usize = 100;

fn check_name(name: &[u8]) -> Result<()> {
    if name.iter().any(|&b| b == b'\n' || b == b'\r') {
        return Err(Error::new(ErrorKind::WrongType));
    }
    Ok(())
}

fn check_lengths(name: &[u8], sequence_len: usize, qualities_len: Option<usize>) -> Result<()> {
    if let Some(qual_len) = qualities_len {
        if qual_len != sequence_len {
            return Err(Error::new(ErrorKind::LengthMismatch {
                name: shorten(name),
                seq_len: sequence_len,
                qual_len,
            }));
        }
    }
    Ok(())
}

fn elide(bytes: &[u8]) -> String {
    shorten_to(bytes, REPR_ELIDE_LIMIT)
}

fn repr(type_name: &str, name: &[u8], sequence: &[u8], qualities: Option<&[u8]>) -> String {
    let qual_repr = match qualities {
        Some(q) => format!("Some(\"{}\")", elide(q)),
        None => "None".to_string(),
    };
    format!(
        "{type_name} {{ name: \"{}\", sequence: \"{}\", qualities: {} }}",
        elide(name),
        elide(sequence),
        qual_repr
    )
}

/// Produces the exact FASTQ wire-format byte buffer for one record,
/// pre-sized to its final length and filled by a single pass of
/// `extend_from_slice` calls (no reallocation; see spec.md §4.4).
pub(crate) fn fastq_bytes(
    name: &[u8],
    sequence: &[u8],
    qualities: &[u8],
    two_headers: bool,
) -> Vec<u8> {
    let repeat_len = if two_headers { name.len() } else { 0 };
    let capacity = 1 + name.len() + 1 + sequence.len() + 1 + 1 + repeat_len + 1 + qualities.len() + 1;
    let mut buf = Vec::with_capacity(capacity);
    buf.push(b'@');
    buf.extend_from_slice(name);
    buf.push(b'\n');
    buf.extend_from_slice(sequence);
    buf.push(b'\n');
    buf.push(b'+');
    if two_headers {
        buf.extend_from_slice(name);
    }
    buf.push(b'\n');
    buf.extend_from_slice(qualities);
    buf.push(b'\n');
    debug_assert_eq!(buf.len(), capacity);
    buf
}

/// A FASTQ record whose fields are opaque byte strings. `qualities` is
/// optional at construction time, though every record the streaming parser
/// emits in this variant carries one (a complete 4-line record always has a
/// quality line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    name: Vec<u8>,
    sequence: Vec<u8>,
    qualities: Option<Vec<u8>>,
}

impl RawRecord {
    /// Construct and validate a record. Fails with [`ErrorKind::LengthMismatch`]
    /// if `qualities` is present and its length differs from `sequence`'s.
    pub fn new(name: Vec<u8>, sequence: Vec<u8>, qualities: Option<Vec<u8>>) -> Result<Self> {
        check_name(&name)?;
        check_lengths(&name, sequence.len(), qualities.as_ref().map(Vec::len))?;
        Ok(RawRecord {
            name,
            sequence,
            qualities,
        })
    }

    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    #[inline]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    #[inline]
    pub fn qualities(&self) -> Option<&[u8]> {
        self.qualities.as_deref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// A new record covering `sequence[range]` (and `qualities[range]` if
    /// present); `name` is carried unchanged.
    pub fn slice(&self, range: Range<usize>) -> Self {
        RawRecord {
            name: self.name.clone(),
            sequence: self.sequence[range.clone()].to_vec(),
            qualities: self.qualities.as_ref().map(|q| q[range].to_vec()),
        }
    }

    /// The quality scores, or [`ErrorKind::MissingQualities`] if absent.
    pub fn qualities_as_bytes(&self) -> Result<&[u8]> {
        self.qualities
            .as_deref()
            .ok_or_else(|| Error::new(ErrorKind::MissingQualities))
    }

    /// Serialize to FASTQ wire format; fails if qualities are absent.
    pub fn fastq_bytes(&self, two_headers: bool) -> Result<Vec<u8>> {
        let qualities = self.qualities_as_bytes()?;
        Ok(fastq_bytes(&self.name, &self.sequence, qualities, two_headers))
    }

    /// Whether `self` and `other` look like opposite mates of the same pair.
    #[inline]
    pub fn is_mate(&self, other: &RawRecord) -> bool {
        ids_match(&self.name, &other.name)
    }

    /// Human-readable dump, with long fields elided in the middle.
    pub fn repr(&self) -> String {
        repr("RawRecord", &self.name, &self.sequence, self.qualities())
    }
}

/// A FASTQ record whose fields are guaranteed 7-bit ASCII text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    name: String,
    sequence: String,
    qualities: Option<String>,
}

impl TextRecord {
    /// Construct and validate a record. Fails with [`ErrorKind::NonAscii`] if
    /// any field contains a non-ASCII byte, or [`ErrorKind::LengthMismatch`]
    /// if `qualities` is present and its length differs from `sequence`'s.
    pub fn new(
        name: impl Into<String>,
        sequence: impl Into<String>,
        qualities: Option<String>,
    ) -> Result<Self> {
        let name = name.into();
        let sequence = sequence.into();
        if !is_ascii(name.as_bytes())
            || !is_ascii(sequence.as_bytes())
            || qualities.as_ref().is_some_and(|q| !is_ascii(q.as_bytes()))
        {
            return Err(Error::new(ErrorKind::NonAscii { line: 0 }));
        }
        Self::from_ascii_checked(name.into_bytes(), sequence.into_bytes(), qualities.map(String::into_bytes))
    }

    /// Build from byte buffers already known to be 7-bit ASCII (e.g. after
    /// the parser's single bulk scan over the whole record). Skips the
    /// per-field ASCII re-scan that [`TextRecord::new`] performs.
    pub(crate) fn from_ascii_checked(
        name: Vec<u8>,
        sequence: Vec<u8>,
        qualities: Option<Vec<u8>>,
    ) -> Result<Self> {
        check_name(&name)?;
        check_lengths(&name, sequence.len(), qualities.as_ref().map(Vec::len))?;
        // Bytes are ASCII by contract of the caller, so this is valid UTF-8.
        let name = String::from_utf8(name).expect("ascii-validated name is valid UTF-8");
        let sequence =
            String::from_utf8(sequence).expect("ascii-validated sequence is valid UTF-8");
        let qualities = qualities
            .map(|q| String::from_utf8(q).expect("ascii-validated qualities is valid UTF-8"));
        Ok(TextRecord {
            name,
            sequence,
            qualities,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    #[inline]
    pub fn qualities(&self) -> Option<&str> {
        self.qualities.as_deref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// A new record covering `sequence[range]` (and `qualities[range]` if
    /// present); `name` is carried unchanged. Every byte index is a valid
    /// char boundary here since the whole record is ASCII.
    pub fn slice(&self, range: Range<usize>) -> Self {
        TextRecord {
            name: self.name.clone(),
            sequence: self.sequence[range.clone()].to_string(),
            qualities: self.qualities.as_ref().map(|q| q[range].to_string()),
        }
    }

    /// The quality scores, or [`ErrorKind::MissingQualities`] if absent.
    pub fn qualities_as_bytes(&self) -> Result<&[u8]> {
        self.qualities
            .as_deref()
            .map(str::as_bytes)
            .ok_or_else(|| Error::new(ErrorKind::MissingQualities))
    }

    /// Serialize to FASTQ wire format; fails if qualities are absent.
    pub fn fastq_bytes(&self, two_headers: bool) -> Result<Vec<u8>> {
        let qualities = self.qualities_as_bytes()?;
        Ok(fastq_bytes(
            self.name.as_bytes(),
            self.sequence.as_bytes(),
            qualities,
            two_headers,
        ))
    }

    /// Whether `self` and `other` look like opposite mates of the same pair.
    #[inline]
    pub fn is_mate(&self, other: &TextRecord) -> bool {
        ids_match(self.name.as_bytes(), other.name.as_bytes())
    }

    /// Human-readable dump, with long fields elided in the middle.
    pub fn repr(&self) -> String {
        repr(
            "TextRecord",
            self.name.as_bytes(),
            self.sequence.as_bytes(),
            self.qualities.as_deref().map(str::as_bytes),
        )
    }
}

/// Builds a record of type `R` from the textual fields of one parsed FASTQ
/// record. Parameterizing the parser over this trait is how custom record
/// types (the "custom record class injection" in spec.md §9) are supported.
pub trait Builder<R> {
    /// Whether the parser must run its bulk ASCII validation over the raw
    /// record bytes before calling [`Builder::build`]. `true` for anything
    /// that hands back text (the default); [`RawBuilder`] overrides this.
    fn requires_ascii(&self) -> bool {
        true
    }

    fn build(&self, name: &[u8], sequence: &[u8], qualities: Option<&[u8]>) -> Result<R>;
}

/// Canonical builder producing [`RawRecord`]s: no ASCII validation, fields
/// copied verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawBuilder;

impl Builder<RawRecord> for RawBuilder {
    #[inline]
    fn requires_ascii(&self) -> bool {
        false
    }

    fn build(&self, name: &[u8], sequence: &[u8], qualities: Option<&[u8]>) -> Result<RawRecord> {
        RawRecord::new(name.to_vec(), sequence.to_vec(), qualities.map(<[u8]>::to_vec))
    }
}

/// Canonical builder producing [`TextRecord`]s. Relies on the parser having
/// already ASCII-validated the whole record (see [`Builder::requires_ascii`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct TextBuilder;

impl Builder<TextRecord> for TextBuilder {
    fn build(&self, name: &[u8], sequence: &[u8], qualities: Option<&[u8]>) -> Result<TextRecord> {
        TextRecord::from_ascii_checked(
            name.to_vec(),
            sequence.to_vec(),
            qualities.map(<[u8]>::to_vec),
        )
    }
}
