//! XER serializer.
//!
//! Emits the header record, each table marker, each column record, and one
//! record per row, from the document's raw tables. Tables the engine never
//! touched come out field-for-field identical to ingestion; mutated entity
//! state must have been synced back with `XerDocument::sync_entity_columns`
//! before writing.

use std::path::Path;

use encoding_rs::WINDOWS_1252;
use xersched_core::{XerDocument, XerError};

/// Render the document as XER text.
pub fn write_string(document: &XerDocument) -> String {
    let mut out = String::new();
    out.push_str("ERMHDR");
    for value in &document.header {
        out.push('\t');
        out.push_str(value);
    }
    out.push('\n');

    for table in &document.tables {
        out.push_str("%T\t");
        out.push_str(&table.name);
        out.push('\n');
        out.push_str("%F");
        for column in &table.columns {
            out.push('\t');
            out.push_str(column);
        }
        out.push('\n');
        for row in &table.rows {
            out.push_str("%R");
            for value in row {
                out.push('\t');
                out.push_str(value);
            }
            out.push('\n');
        }
    }
    out
}

/// Render the document as bytes in the legacy Western code page.
/// Non-representable characters are replaced, never raised on.
pub fn write_bytes(document: &XerDocument) -> Vec<u8> {
    let text = write_string(document);
    let (bytes, _, _) = WINDOWS_1252.encode(&text);
    bytes.into_owned()
}

/// Write the document to a file.
pub fn write_file(document: &XerDocument, path: &Path) -> Result<(), XerError> {
    std::fs::write(path, write_bytes(document))?;
    Ok(())
}
