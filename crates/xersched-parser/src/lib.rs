//! # xersched-parser
//!
//! Reader and writer for the tabular XER exchange format.
//!
//! Parsing runs in three layers: byte decoding in the legacy Western code
//! page, structural splitting into named tables, then typed entity
//! construction with batch validation. The same raw tables feed the
//! serializer, so everything the engine does not own round-trips verbatim.
//!
//! ## Example
//!
//! ```no_run
//! use xersched_parser::parse_file;
//!
//! let outcome = parse_file(std::path::Path::new("schedule.xer"))?;
//! for diagnostic in &outcome.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! println!("{} activities", outcome.document.activities.len());
//! # Ok::<(), xersched_core::XerError>(())
//! ```

use std::path::Path;

use xersched_core::XerError;

pub mod calendar;
pub mod document;
pub mod tabular;
pub mod writer;

pub use calendar::serial_to_date;
pub use document::{build_document, ParseOutcome};
pub use tabular::{decode_bytes, parse_tabular, TabularFile};
pub use writer::{write_bytes, write_file, write_string};

/// Parse already-decoded XER text.
pub fn parse_str(contents: &str) -> Result<ParseOutcome, XerError> {
    build_document(parse_tabular(contents)?)
}

/// Decode and parse raw XER bytes.
pub fn parse_bytes(bytes: &[u8]) -> Result<ParseOutcome, XerError> {
    parse_str(&decode_bytes(bytes))
}

/// Read, decode, and parse an XER file.
pub fn parse_file(path: &Path) -> Result<ParseOutcome, XerError> {
    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes)
}
