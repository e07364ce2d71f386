//! BSV: the binary row format passed between pipeline stages.
//!
//! A row is its columns in order, each written as a little-endian `u16` byte
//! length followed by that many raw bytes. There is no row header or terminator:
//! producer and consumer agree on the column count out of band, and the reader is
//! told how many columns to expect.
//!
//! ```text
//! | len0: u16 LE | bytes0 | len1: u16 LE | bytes1 | ... | lenN: u16 LE | bytesN |
//! ```
//!
//! A stream that ends exactly on a row boundary is a clean end. A stream that ends
//! inside a row is a [`PipelineError::TruncatedRow`].

use anyhow::Result;
use std::ops::Range;

use crate::error::PipelineError;
use crate::io::RowRead;
use crate::io::stream::ByteStream;
use crate::io::writer::RowWriter;
use crate::row::{MAX_COLUMNS, Row};

/// Width of the per-column length prefix.
pub const LEN_PREFIX: usize = 2;

/// Largest column a BSV row can carry.
pub const MAX_COLUMN_LEN: usize = u16::MAX as usize;

/// Append the BSV encoding of `columns` to `out`.
///
/// # Errors
/// [`PipelineError::ColumnTooLong`] if a column exceeds [`MAX_COLUMN_LEN`]; nothing
/// is appended in that case.
pub fn encode_columns<'c, I>(columns: I, out: &mut Vec<u8>) -> Result<(), PipelineError>
where
    I: IntoIterator<Item = &'c [u8]>,
    I::IntoIter: Clone,
{
    let columns = columns.into_iter();
    if let Some(long) = columns.clone().find(|c| c.len() > MAX_COLUMN_LEN) {
        return Err(PipelineError::ColumnTooLong { len: long.len() });
    }
    for column in columns {
        out.extend_from_slice(&(column.len() as u16).to_le_bytes());
        out.extend_from_slice(column);
    }
    Ok(())
}

/// BSV encoding of a whole row.
pub fn encode_row(row: &Row<'_>, out: &mut Vec<u8>) -> Result<(), PipelineError> {
    encode_columns(row.iter(), out)
}

/// Decode one row of `columns` columns from the front of `bytes`.
///
/// Returns the row and the number of bytes it occupied, or `None` if `bytes` is
/// empty.
pub fn decode_row(bytes: &[u8], columns: usize) -> Result<Option<(Row<'_>, usize)>, PipelineError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let mut pos = 0;
    let mut out = Vec::with_capacity(columns);
    for _ in 0..columns {
        let Some(prefix) = bytes.get(pos..pos + LEN_PREFIX) else {
            return Err(PipelineError::TruncatedRow {
                row: 0,
                offset: bytes.len() as u64,
            });
        };
        let len = u16::from_le_bytes([prefix[0], prefix[1]]) as usize;
        pos += LEN_PREFIX;
        let Some(column) = bytes.get(pos..pos + len) else {
            return Err(PipelineError::TruncatedRow {
                row: 0,
                offset: bytes.len() as u64,
            });
        };
        out.push(column);
        pos += len;
    }
    Ok(Some((Row::new(out, 0)?, pos)))
}

/// Write one row to `writer` in BSV form.
pub fn write_row(writer: &mut RowWriter, row: &Row<'_>) -> Result<()> {
    write_columns(writer, row.iter())
}

/// Write columns to `writer` in BSV form without building a [`Row`].
pub fn write_columns<'c, I>(writer: &mut RowWriter, columns: I) -> Result<()>
where
    I: IntoIterator<Item = &'c [u8]>,
{
    for column in columns {
        if column.len() > MAX_COLUMN_LEN {
            return Err(PipelineError::ColumnTooLong { len: column.len() }.into());
        }
        writer.write_bytes(&(column.len() as u16).to_le_bytes())?;
        writer.write_bytes(column)?;
    }
    Ok(())
}

/// Streaming BSV reader.
pub struct BsvReader {
    stream: ByteStream,
    columns: usize,
    spans: Vec<Range<usize>>,
    rows: u64,
}

impl BsvReader {
    /// Reader for rows of exactly `columns` columns.
    pub fn new(stream: ByteStream, columns: usize) -> Self {
        Self {
            stream,
            columns,
            spans: Vec::with_capacity(columns),
            rows: 0,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows_read(&self) -> u64 {
        self.rows
    }

    /// Load the next row using the column count given at construction.
    pub fn read_row(&mut self) -> Result<Option<Row<'_>>> {
        let columns = self.columns;
        self.load_next(columns)
    }

    /// Load the next row of `columns` columns.
    ///
    /// Returns `Ok(None)` at a clean end of input. The whole row is buffered
    /// before any column is handed out, so all columns stay valid together.
    ///
    /// # Errors
    /// [`PipelineError::TruncatedRow`] if input ends mid-row (in a length prefix
    /// or a payload).
    pub fn load_next(&mut self, columns: usize) -> Result<Option<Row<'_>>> {
        if columns == 0 || columns >= MAX_COLUMNS {
            return Err(PipelineError::TooManyColumns {
                row: self.rows + 1,
                found: columns,
            }
            .into());
        }
        if !self.stream.fill()? {
            return Ok(None);
        }
        let row = self.rows + 1;
        let row_start = self.stream.position();

        self.spans.clear();
        let mut pos = 0;
        for _ in 0..columns {
            if self.stream.ensure(pos + LEN_PREFIX)? < pos + LEN_PREFIX {
                return Err(self.truncated(row, row_start));
            }
            let prefix = &self.stream.available()[pos..pos + LEN_PREFIX];
            let len = u16::from_le_bytes([prefix[0], prefix[1]]) as usize;
            pos += LEN_PREFIX;
            if self.stream.ensure(pos + len)? < pos + len {
                return Err(self.truncated(row, row_start));
            }
            self.spans.push(pos..pos + len);
            pos += len;
        }

        self.rows = row;
        let data = self.stream.consume(pos);
        let out = self.spans.iter().map(|r| &data[r.clone()]).collect();
        Ok(Some(Row::new(out, row)?))
    }

    /// The current source ended inside `row`; report where.
    fn truncated(&self, row: u64, row_start: u64) -> anyhow::Error {
        let offset = row_start + self.stream.available().len() as u64;
        let err = PipelineError::TruncatedRow { row, offset };
        match self.stream.source_name() {
            Some(name) => anyhow::Error::new(err).context(format!("read bsv from {name}")),
            None => err.into(),
        }
    }
}

impl RowRead for BsvReader {
    fn read_row(&mut self) -> Result<Option<Row<'_>>> {
        BsvReader::read_row(self)
    }

    fn rows_read(&self) -> u64 {
        self.rows
    }
}
