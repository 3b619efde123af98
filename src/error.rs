//! Error types for the parser, record codec, and serializer.
//!
//! Follows the same layout trick as `seq_io::error`: the kind is boxed so
//! that `Result<T, Error>` stays small regardless of how large an individual
//! variant (e.g. one carrying an `io::Error`) gets.

use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Maximum length (in characters) of a truncated snippet embedded in error
/// messages.
const SHORTEN_LIMIT: usize = 500;

/// Truncate `bytes` (interpreted lossily as UTF-8) to at most `limit`
/// characters, eliding the middle with `…` if it was longer. Always cuts on
/// a char boundary. Shared by `Error`'s `Display` impl (via [`shorten`]) and
/// `record::repr()`, which calls this directly with its own, smaller limit.
pub(crate) fn shorten_to(bytes: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return text.into_owned();
    }
    let half = limit.saturating_sub(1) / 2;
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{head}\u{2026}{tail}")
}

/// [`shorten_to`] with the default 500-character limit used throughout
/// error messages.
pub(crate) fn shorten(bytes: &[u8]) -> String {
    shorten_to(bytes, SHORTEN_LIMIT)
}

#[derive(Debug)]
pub enum ErrorKind {
    /// Malformed FASTQ content at the given 0-based line number within the
    /// whole stream.
    FastqFormat { line: u64, message: String },
    /// A record field of the wrong kind was passed to a variant-specific
    /// constructor (e.g. a raw byte string where ASCII text was required).
    WrongType,
    /// The textual record constructor received non-ASCII input.
    NonAscii { line: u64 },
    /// `qualities` length differs from `sequence` length.
    LengthMismatch {
        name: String,
        seq_len: usize,
        qual_len: usize,
    },
    /// `qualities_as_bytes`/`fastq_bytes` called on a record without
    /// qualities.
    MissingQualities,
    /// The underlying stream's fill primitive returned an error.
    Io(io::Error),
    /// Buffer growth or record allocation failed.
    OutOfMemory,
}

#[derive(Debug)]
pub struct Error {
    kind: Box<ErrorKind>,
}

impl Error {
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[inline]
    pub fn into_kind(self) -> ErrorKind {
        *self.kind
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::new(ErrorKind::Io(e))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind() {
            ErrorKind::FastqFormat { line, message } => {
                write!(f, "FASTQ format error at line {}: {}", line + 1, message)
            }
            ErrorKind::WrongType => write!(f, "record field has the wrong kind for this variant"),
            ErrorKind::NonAscii { line } => {
                write!(f, "non-ASCII byte in record at line {}", line + 1)
            }
            ErrorKind::LengthMismatch {
                name,
                seq_len,
                qual_len,
            } => write!(
                f,
                "'{}': sequence length {} does not match quality length {}",
                shorten(name.as_bytes()),
                seq_len,
                qual_len
            ),
            ErrorKind::MissingQualities => write!(f, "record has no quality scores"),
            ErrorKind::Io(e) => e.fmt(f),
            ErrorKind::OutOfMemory => write!(f, "allocation failed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_cuts_on_char_boundaries() {
        // 600 repetitions of '€' (3 bytes each, 1800 bytes total) exceeds
        // the 500-character limit without any codepoint boundary landing on
        // the byte offsets a naive byte-slice truncation would cut at.
        let name = "\u{20AC}".repeat(600);
        let err = Error::new(ErrorKind::LengthMismatch {
            name: name.clone(),
            seq_len: 1,
            qual_len: 2,
        });
        let message = format!("{err}");
        assert!(message.contains('\u{2026}'));
        assert!(message.len() < name.len());
    }

    #[test]
    fn shorten_does_not_panic_below_limit_with_multibyte_chars() {
        // 200 repetitions of '€' is 600 bytes but only 200 chars, under the
        // 500-char limit: must come back unchanged, not panic on byte len.
        let name = "\u{20AC}".repeat(200);
        assert_eq!(shorten(name.as_bytes()), name);
    }

    #[test]
    fn shorten_to_short_input_is_unchanged() {
        assert_eq!(shorten_to(b"hello", 500), "hello");
    }
}
