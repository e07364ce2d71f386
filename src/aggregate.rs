//! Streaming group-by-sum over byte-string keys.
//!
//! Rows arrive one at a time as `[key, value, ...]`, where `value` is the raw
//! little-endian bytes of an `f64`. The key is copied into the table only the first
//! time it is seen; later rows with the same key update the running sum in place.

use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;

use crate::error::PipelineError;
use crate::io::Format;
use crate::io::output::RowOutput;
use crate::row::Row;

/// Width of the value column.
pub const VALUE_WIDTH: usize = std::mem::size_of::<f64>();

/// Per-key running sums.
#[derive(Debug, Default)]
pub struct SumAggregator {
    table: HashMap<Box<[u8]>, f64>,
    key_width: Option<usize>,
    rows: u64,
}

impl SumAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate keys longer than `width` bytes to their first `width` bytes.
    pub fn with_key_width(mut self, width: usize) -> Self {
        self.key_width = Some(width);
        self
    }

    /// Fold one row into the table: column 0 is the key, column 1 the value.
    ///
    /// # Errors
    /// [`PipelineError::MissingValueColumn`] for a one-column row and
    /// [`PipelineError::ValueWidth`] if the value is not exactly 8 bytes.
    pub fn add_row(&mut self, row: &Row<'_>) -> Result<(), PipelineError> {
        let row_no = self.rows + 1;
        let (Some(key), Some(value)) = (row.column(0), row.column(1)) else {
            return Err(PipelineError::MissingValueColumn {
                row: row_no,
                found: row.len(),
            });
        };
        let value: [u8; VALUE_WIDTH] = value.try_into().map_err(|_| PipelineError::ValueWidth {
            row: row_no,
            found: value.len(),
        })?;
        let key = match self.key_width {
            Some(width) if key.len() > width => &key[..width],
            _ => key,
        };
        self.add(key, f64::from_le_bytes(value));
        self.rows = row_no;
        Ok(())
    }

    /// Add `value` to the sum for `key`, copying the key on first sight.
    pub fn add(&mut self, key: &[u8], value: f64) {
        if let Some(sum) = self.table.get_mut(key) {
            *sum += value;
        } else {
            self.table.insert(key.into(), value);
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<f64> {
        self.table.get(key).copied()
    }

    /// Distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Rows folded in so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Every `(key, sum)` pair, each exactly once, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], f64)> {
        self.table.iter().map(|(k, v)| (&**k, *v))
    }

    /// Write one `[key, sum]` row per key and release the table.
    ///
    /// BSV output carries the sum as 8 raw little-endian bytes; text output
    /// renders it as a decimal number. Returns the number of rows written.
    pub fn dump(self, out: &mut RowOutput) -> Result<u64> {
        let mut written = 0;
        for (key, sum) in &self.table {
            match out.format() {
                Format::Bsv => out.write_columns([&**key, &sum.to_le_bytes()[..]])?,
                Format::Csv => out.write_columns([&**key, sum.to_string().as_bytes()])?,
            }
            written += 1;
        }
        debug!(keys = written, rows = self.rows, "dumped sums");
        Ok(written)
    }
}
