// src/csv.rs

use anyhow::{Context, Result};
use ::csv::{ByteRecord, QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};

/// One line of the sheet export, one cell per column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRow(Vec<String>);

impl RawRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self(cells)
    }

    /// Cell at column `idx`, or `None` when the row is shorter than that.
    pub fn cell(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for RawRow {
    fn from(cells: Vec<String>) -> Self {
        Self(cells)
    }
}

impl<'a> From<Vec<&'a str>> for RawRow {
    fn from(cells: Vec<&'a str>) -> Self {
        Self(cells.into_iter().map(str::to_string).collect())
    }
}

/// Split `text` into rows. Handles `\n` and `\r\n` endings and skips blank
/// lines. Never fails: broken quoting ends up as literal cell content.
pub fn parse(text: &str) -> Vec<RawRow> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(|line| RawRow(split_csv_line(line)))
        .collect()
}

/// Split one line on commas, honouring double-quoted fields. Inside quotes a
/// doubled `""` is a literal quote; a quote in the middle of an unquoted
/// field is kept as is. An unterminated quote swallows the rest of the line
/// into the current field.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_reader(line.as_bytes());

    let mut record = ByteRecord::new();
    match rdr.read_byte_record(&mut record) {
        Ok(true) => record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect(),
        Ok(false) => vec![String::new()],
        // reading from a byte slice has no IO to fail; keep the line whole
        Err(_) => vec![line.to_string()],
    }
}

/// Inverse of [`split_csv_line`]: quotes a cell only when it needs it,
/// doubling embedded quotes.
pub fn to_csv_line<S: AsRef<str>>(cells: &[S]) -> Result<String> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(cells.iter().map(|c| c.as_ref()))
        .context("serializing CSV row")?;
    let bytes = wtr.into_inner().context("flushing CSV row")?;
    let line = String::from_utf8(bytes).context("CSV row is not UTF-8")?;
    Ok(line.trim_end_matches('\n').to_string())
}
