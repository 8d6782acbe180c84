//! Minimal CSV reading and writing (quotes + CRLF tolerant).
//!
//! The export format is plain RFC-4180-style CSV; the reader streams
//! records from any `BufRead` so ingestion never loads a whole file.

use std::io::{self, BufRead, Write};

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row, quoting fields only where required.
pub fn write_row<W: Write>(mut w: W, row: &[&str]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{escaped}\"")?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

/// Split one raw record (which may span physical lines inside quotes)
/// into fields.
fn split_record(record: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = record.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next(); // double-quote escape
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(ch),
        }
    }
    fields.push(field);
    fields
}

/// Streaming CSV record reader.
///
/// Yields one record (vector of fields) at a time, accumulating physical
/// lines until quotes balance so embedded newlines survive.
pub struct CsvReader<R: BufRead> {
    inner: R,
    buf: String,
}

impl<R: BufRead> CsvReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: String::new(),
        }
    }

    /// Read the next record, or `None` at end of input.
    pub fn next_record(&mut self) -> io::Result<Option<Vec<String>>> {
        self.buf.clear();
        let mut record = String::new();

        loop {
            self.buf.clear();
            let n = self.inner.read_line(&mut self.buf)?;
            if n == 0 {
                if record.is_empty() {
                    return Ok(None);
                }
                break;
            }
            record.push_str(&self.buf);
            // An odd number of quote characters means a quoted field is
            // still open and the newline belongs to it.
            if record.matches('"').count() % 2 == 0 {
                break;
            }
        }

        let trimmed = record.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            // Blank separator line; try the next one.
            return self.next_record();
        }
        Ok(Some(split_record(trimmed)))
    }
}
