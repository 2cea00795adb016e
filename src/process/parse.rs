// src/process/parse.rs
use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::mem::decode_latin1;
use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};
use tracing::{info, instrument};

use crate::error::ParseError;
use crate::process::table::RecordTable;

/// Whitespace stripped from headers and cells: Unicode whitespace (which
/// covers U+0085 and U+00A0) plus the ASCII separators 0x1C–0x1F.
fn is_strip_char(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// ISO-8859-1 decode, then trim.
fn clean_field(raw: &[u8]) -> String {
    decode_latin1(raw).trim_matches(is_strip_char).to_string()
}

/// True when `bytes`, read as the start of a record, leave a quoted field open at the end.
///
/// Mirrors the reader's quoting rules: a quote only opens a field at its
/// first byte, `""` inside quotes is a literal quote, and once a quoted
/// field closes any further quotes in it are literal.
fn quote_left_open(bytes: &[u8]) -> bool {
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut iter = bytes.iter().peekable();
    while let Some(&b) = iter.next() {
        if in_quotes {
            if b == b'"' {
                if iter.peek() == Some(&&b'"') {
                    iter.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }
        match b {
            b'"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            b',' | b'\n' | b'\r' => at_field_start = true,
            _ => at_field_start = false,
        }
    }
    in_quotes
}

/// Re-read the file from `offset` (the start of its last record) and check for an open quote.
///
/// An unclosed quote always runs to end of file, so it can only sit in the last record.
fn ends_inside_quotes(file: &mut File, offset: u64) -> io::Result<bool> {
    file.seek(SeekFrom::Start(offset))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;
    Ok(quote_left_open(&tail))
}

/// Load an extracted absentee CSV as an all-text [`RecordTable`].
///
/// Fields are decoded as ISO-8859-1 one at a time as records stream off
/// disk, headers and cells are trimmed, and no type inference happens. A
/// file with a header but no data rows is `Ok` and empty; a file with no
/// header at all is [`ParseError::EmptyInput`]; a file that ends inside a
/// quoted field is [`ParseError::UnterminatedQuote`].
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn parse_absentee_file<P: AsRef<Path>>(path: P) -> Result<RecordTable, ParseError> {
    let path = path.as_ref();
    let io_err = |source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    };
    let malformed = |source| ParseError::Malformed {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    // latin1 is ASCII-compatible, so delimiters and quotes can be found before decoding
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let header_record = rdr.byte_headers().map_err(malformed)?.clone();
    let headers: Vec<String> = header_record.iter().map(clean_field).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(ParseError::EmptyInput(path.to_path_buf()));
    }
    let mut last_start = header_record.position().cloned();

    let mut table = RecordTable::new(headers);
    let mut record = ByteRecord::new();
    while rdr.read_byte_record(&mut record).map_err(malformed)? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() > table.headers.len() {
            return Err(ParseError::TooManyFields {
                path: path.to_path_buf(),
                line,
                expected: table.headers.len(),
                found: record.len(),
            });
        }
        last_start = record.position().cloned();
        table.push_row(record.iter().map(clean_field).collect());
    }

    if let Some(pos) = last_start {
        let mut file = rdr.into_inner();
        if ends_inside_quotes(&mut file, pos.byte()).map_err(io_err)? {
            return Err(ParseError::UnterminatedQuote {
                path: path.to_path_buf(),
                line: pos.line(),
            });
        }
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(records = table.len(), file = %name, "loaded records");
    Ok(table)
}
