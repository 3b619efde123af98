//! A streaming FASTQ parser and record codec.
//!
//! Reads 4-line FASTQ records out of anything implementing `std::io::Read`,
//! growing its internal buffer on demand so a record of any size can be
//! parsed without arbitrary limits. Two record flavors are provided:
//! [`record::RawRecord`] (opaque byte strings) and [`record::TextRecord`]
//! (validated 7-bit ASCII text), both producible through the streaming
//! [`parser::Parser`] or built directly.
//!
//! # Example
//!
//! ```no_run
//! use fastq_codec::parser::Parser;
//!
//! let mut parser = Parser::new(std::io::stdin());
//! while let Some(record) = parser.next() {
//!     let record = record.expect("malformed FASTQ record");
//!     println!("{}", record.name());
//! }
//! ```
//!
//! # Large sequences
//!
//! Each record must fit into the parser's buffer as a whole. The buffer
//! starts at [`parser::DEFAULT_CAPACITY`] and doubles whenever a record
//! doesn't fit, so there is no hard ceiling on record size.
//!
//! # Mate-pair matching
//!
//! [`idmatch::ids_match`] decides whether two record names belong to the
//! same read pair, tolerating a single trailing mate-number digit.
//! [`sync::sync_paired_heads`] finds how much of two parallel FASTQ buffers
//! holds whole records, for use when streaming R1/R2 inputs in lockstep.

extern crate memchr;

#[macro_use]
extern crate serde_derive;
extern crate serde;

pub mod ascii;
pub mod error;
pub mod idmatch;
pub mod parser;
pub mod record;
pub mod sync;

pub use error::{Error, ErrorKind, Result};
pub use parser::Parser;
pub use record::{Builder, RawBuilder, RawRecord, TextBuilder, TextRecord};
