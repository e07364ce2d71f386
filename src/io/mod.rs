//! Byte streams, row readers, and row writers.
//!
//! - [`stream`] - the logical input stream over one or more sources
//! - [`delimited`] - zero-copy text reader
//! - [`bsv`] - binary row codec
//! - [`writer`] - buffered multi-sink writer
//! - [`output`] - rows to a writer as text or BSV
//! - [`compression`] - transparent (de)compression beneath readers and writers
//! - [`paths`] - input path collection

pub mod bsv;
pub mod compression;
pub mod delimited;
pub mod output;
pub mod paths;
pub mod stream;
pub mod writer;

use anyhow::Result;
use std::path::PathBuf;

use crate::error::PipelineError;
use crate::row::{ColumnCount, Row};
use bsv::BsvReader;
use delimited::DelimitedReader;
use stream::{ByteStream, Source};

/// On-the-wire representation of rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Format {
    /// Delimiter-separated text, one row per line.
    Csv,
    /// Length-prefixed binary columns.
    Bsv,
}

/// Anything that yields rows one at a time.
///
/// A returned row borrows the reader and is invalidated by the next call.
pub trait RowRead {
    fn read_row(&mut self) -> Result<Option<Row<'_>>>;

    /// Rows returned so far.
    fn rows_read(&self) -> u64;
}

/// Where and how to read rows from.
#[derive(Clone, Debug)]
pub struct InputSpec {
    /// Files read back to back; stdin when empty.
    pub paths: Vec<PathBuf>,
    pub format: Format,
    /// For text input, an assertion on every row. For BSV input, the
    /// out-of-band column count, which must be exact.
    pub columns: Option<ColumnCount>,
    pub delimiter: u8,
    pub codec: Option<String>,
}

impl InputSpec {
    fn sources(&self) -> Result<Vec<Source>> {
        if self.paths.is_empty() {
            return Ok(vec![Source::stdin(self.codec.as_deref())?]);
        }
        self.paths
            .iter()
            .map(|p| Source::open(p, self.codec.as_deref()))
            .collect()
    }

    /// Open the sources and build the matching reader.
    ///
    /// `required` is what the consuming transform needs from every row; it is
    /// combined with any column count set on this input.
    pub fn open(&self, required: ColumnCount) -> Result<Box<dyn RowRead>> {
        let expect = resolve_columns(self.columns, required)?;
        let stream = ByteStream::new(self.sources()?);
        match (self.format, expect) {
            (Format::Csv, expect) => Ok(Box::new(
                DelimitedReader::new(stream)
                    .with_delimiter(self.delimiter)
                    .expect_columns(expect),
            )),
            (Format::Bsv, ColumnCount::Exact(n)) => Ok(Box::new(BsvReader::new(stream, n))),
            (Format::Bsv, ColumnCount::AtLeast(_)) => Err(PipelineError::usage(
                "bsv input needs an exact column count (--columns N)",
            )
            .into()),
        }
    }
}

/// Combine a user-given column count with what a transform requires.
///
/// # Errors
/// [`PipelineError::Usage`] when the two cannot both hold.
pub fn resolve_columns(
    given: Option<ColumnCount>,
    required: ColumnCount,
) -> Result<ColumnCount, PipelineError> {
    use ColumnCount::{AtLeast, Exact};
    let resolved = match (given, required) {
        (None, required) => Some(required),
        (Some(Exact(n)), Exact(m)) => (n == m).then_some(Exact(n)),
        (Some(Exact(n)), AtLeast(m)) => (n >= m).then_some(Exact(n)),
        (Some(AtLeast(n)), Exact(m)) => (m >= n).then_some(Exact(m)),
        (Some(AtLeast(n)), AtLeast(m)) => Some(AtLeast(n.max(m))),
    };
    resolved.ok_or_else(|| {
        PipelineError::usage(format!(
            "input declared with {} columns but this command needs {required}",
            given.map(|g| g.to_string()).unwrap_or_default()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ColumnCount::{AtLeast, Exact};

    #[test]
    fn resolves_given_and_required_counts() {
        assert_eq!(resolve_columns(None, AtLeast(2)).unwrap(), AtLeast(2));
        assert_eq!(resolve_columns(Some(Exact(8)), AtLeast(2)).unwrap(), Exact(8));
        assert_eq!(resolve_columns(Some(AtLeast(3)), AtLeast(5)).unwrap(), AtLeast(5));
        assert!(resolve_columns(Some(Exact(1)), AtLeast(2)).is_err());
        assert!(resolve_columns(Some(Exact(3)), Exact(4)).is_err());
    }
}
