//! Byte-level reader for the tabular XER layout.
//!
//! The file is a sequence of LF- or CRLF-terminated records, each split on
//! TAB. The first record must be the `ERMHDR` export header. Tables are
//! introduced by a `%T` record, followed by a `%F` column record and any
//! number of `%R` rows. A `%E` trailer, when present, is accepted and
//! ignored. Corrupt structure is fatal; the reader never guesses.

use encoding_rs::WINDOWS_1252;
use xersched_core::{Table, XerError};

const TABLE_MARKER: &str = "%T";
const FIELD_MARKER: &str = "%F";
const RECORD_MARKER: &str = "%R";
const END_MARKER: &str = "%E";
const HEADER_TOKEN: &str = "ERMHDR";

/// The file split into its header record and raw tables, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TabularFile {
    /// ERMHDR values (version, export date, originator, ...), verbatim.
    pub header: Vec<String>,
    pub tables: Vec<Table>,
}

impl TabularFile {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Decode raw bytes in the legacy Western code page. Invalid bytes are
/// replaced, never raised on.
pub fn decode_bytes(bytes: &[u8]) -> String {
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Parse decoded file contents into header and tables.
pub fn parse_tabular(contents: &str) -> Result<TabularFile, XerError> {
    let mut lines = contents
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    let header_line = lines
        .next()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| XerError::MalformedFile("file is empty".into()))?;
    if !header_line.starts_with(HEADER_TOKEN) {
        return Err(XerError::MalformedFile(format!(
            "first record must be {}, found {:?}",
            HEADER_TOKEN,
            header_line.chars().take(16).collect::<String>()
        )));
    }
    let header: Vec<String> = header_line
        .split('\t')
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut tables: Vec<Table> = Vec::new();
    let mut current: Option<Table> = None;
    let mut line_no = 1usize;

    for line in lines {
        line_no += 1;
        if line.is_empty() {
            continue;
        }
        let (marker, rest) = match line.split_once('\t') {
            Some((marker, rest)) => (marker, rest),
            None => (line, ""),
        };
        match marker {
            TABLE_MARKER => {
                if let Some(table) = current.take() {
                    tables.push(table);
                }
                let name = rest.trim();
                if name.is_empty() {
                    return Err(XerError::MalformedFile(format!(
                        "line {}: table marker without a table name",
                        line_no
                    )));
                }
                current = Some(Table::new(name, Vec::new()));
            }
            FIELD_MARKER => {
                let table = current.as_mut().ok_or_else(|| {
                    XerError::MalformedFile(format!(
                        "line {}: column record outside any table",
                        line_no
                    ))
                })?;
                if !table.columns.is_empty() {
                    return Err(XerError::MalformedFile(format!(
                        "line {}: duplicate column record for table {}",
                        line_no, table.name
                    )));
                }
                table.columns = rest.split('\t').map(str::to_string).collect();
            }
            RECORD_MARKER => {
                let table = current.as_mut().ok_or_else(|| {
                    XerError::MalformedFile(format!(
                        "line {}: data record outside any table",
                        line_no
                    ))
                })?;
                if table.columns.is_empty() {
                    return Err(XerError::MalformedFile(format!(
                        "line {}: data record before column record in table {}",
                        line_no, table.name
                    )));
                }
                let row = parse_row(rest, &table.columns, &table.name, line_no)?;
                table.rows.push(row);
            }
            END_MARKER => {
                if let Some(table) = current.take() {
                    tables.push(table);
                }
            }
            _ => {
                return Err(XerError::MalformedFile(format!(
                    "line {}: unrecognised record marker {:?}",
                    line_no, marker
                )));
            }
        }
    }
    if let Some(table) = current.take() {
        tables.push(table);
    }

    Ok(TabularFile { header, tables })
}

/// Split one `%R` payload into positional values. Trailing whitespace on the
/// final column is stripped; missing trailing columns equal the empty
/// string; anything beyond the declared width that is not blank is a
/// structure error.
fn parse_row(
    rest: &str,
    columns: &[String],
    table_name: &str,
    line_no: usize,
) -> Result<Vec<String>, XerError> {
    let mut values: Vec<String> = rest.split('\t').map(str::to_string).collect();

    if values.len() > columns.len() {
        let overflow_blank = values[columns.len()..].iter().all(|v| v.trim().is_empty());
        if !overflow_blank {
            return Err(XerError::MalformedFile(format!(
                "line {}: table {} row has {} values for {} columns",
                line_no,
                table_name,
                values.len(),
                columns.len()
            )));
        }
        values.truncate(columns.len());
    }
    while values.len() < columns.len() {
        values.push(String::new());
    }
    if let Some(last) = values.last_mut() {
        let trimmed = last.trim_end();
        if trimmed.len() != last.len() {
            *last = trimmed.to_string();
        }
    }
    Ok(values)
}
