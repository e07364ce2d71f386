//! Zero-copy reader for delimiter-separated text.
//!
//! Each record is one line; fields are split on a single delimiter byte (`,` by
//! default). There is no quoting or escaping: every delimiter byte ends a field.
//! Returned columns point into the stream's buffer, so a [`Row`] lives only until
//! the next [`read_row`](DelimitedReader::read_row) call.

use anyhow::Result;
use std::ops::Range;

use crate::error::PipelineError;
use crate::io::RowRead;
use crate::io::stream::ByteStream;
use crate::row::{ColumnCount, MAX_COLUMNS, Row};

pub const DEFAULT_DELIMITER: u8 = b',';

pub struct DelimitedReader {
    stream: ByteStream,
    delimiter: u8,
    expect: ColumnCount,
    spans: Vec<Range<usize>>,
    rows: u64,
}

impl DelimitedReader {
    pub fn new(stream: ByteStream) -> Self {
        Self {
            stream,
            delimiter: DEFAULT_DELIMITER,
            expect: ColumnCount::default(),
            spans: Vec::with_capacity(64),
            rows: 0,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Column count every row must satisfy; a mismatch fails the read.
    pub fn expect_columns(mut self, expect: ColumnCount) -> Self {
        self.expect = expect;
        self
    }

    /// Rows returned so far.
    pub fn rows_read(&self) -> u64 {
        self.rows
    }

    /// Parse the next non-empty line into a row.
    ///
    /// Returns `Ok(None)` once every source is exhausted.
    ///
    /// # Errors
    /// Fails with [`PipelineError::ColumnCount`] if the line does not match the
    /// expected column count, and [`PipelineError::TooManyColumns`] past
    /// [`MAX_COLUMNS`].
    pub fn read_row(&mut self) -> Result<Option<Row<'_>>> {
        // blank lines never produce rows
        loop {
            if !self.stream.fill()? {
                return Ok(None);
            }
            if self.stream.available()[0] != b'\n' {
                break;
            }
            self.stream.consume(1);
        }
        let Some(line) = self.stream.read_until(b'\n')? else {
            return Ok(None);
        };
        self.rows += 1;

        self.spans.clear();
        let mut field_start = 0;
        for (i, &b) in line.iter().enumerate() {
            if b == self.delimiter {
                self.spans.push(field_start..i);
                field_start = i + 1;
            }
        }
        self.spans.push(field_start..line.len());

        if self.spans.len() >= MAX_COLUMNS {
            return Err(PipelineError::TooManyColumns {
                row: self.rows,
                found: self.spans.len(),
            }
            .into());
        }
        self.expect.check(self.spans.len(), self.rows)?;

        let columns = self.spans.iter().map(|r| &line[r.clone()]).collect();
        Ok(Some(Row::new(columns, self.rows)?))
    }
}

impl RowRead for DelimitedReader {
    fn read_row(&mut self) -> Result<Option<Row<'_>>> {
        DelimitedReader::read_row(self)
    }

    fn rows_read(&self) -> u64 {
        self.rows
    }
}
