//! The row data model.
//!
//! A [`Row`] is an ordered sequence of byte-string columns borrowed from the buffer
//! that produced it. Readers hand out rows through `&mut self`, so a row cannot be
//! held across the next read call on the same reader; anything that must survive
//! longer has to be copied out (see [`Row::to_owned_row`]).
//!
//! End of input is represented by the reader returning `None` instead of a row,
//! which takes the place of a `stop` flag: a `Row` value always carries data.

use crate::error::PipelineError;
use std::fmt;

/// Upper bound (exclusive) on the number of columns in one row.
pub const MAX_COLUMNS: usize = 65535;

/// A row of borrowed columns. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Row<'a> {
    columns: Vec<&'a [u8]>,
}

impl<'a> Row<'a> {
    /// Build a row, enforcing `1 <= columns.len() < MAX_COLUMNS`.
    ///
    /// `row` is the 1-based row number used in error messages.
    pub fn new(columns: Vec<&'a [u8]>, row: u64) -> Result<Self, PipelineError> {
        if columns.is_empty() {
            return Err(PipelineError::ColumnCount {
                row,
                expected: "at least 1".into(),
                found: 0,
            });
        }
        if columns.len() >= MAX_COLUMNS {
            return Err(PipelineError::TooManyColumns {
                row,
                found: columns.len(),
            });
        }
        Ok(Self { columns })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false: a row has at least one column.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of the highest valid column (`len() - 1`).
    pub fn max_index(&self) -> usize {
        self.columns.len() - 1
    }

    /// Column `i`, with the lifetime of the underlying buffer rather than of `self`.
    pub fn column(&self, i: usize) -> Option<&'a [u8]> {
        self.columns.get(i).copied()
    }

    pub fn columns(&self) -> &[&'a [u8]] {
        &self.columns
    }

    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, &'a [u8]>> {
        self.columns.iter().copied()
    }

    /// Copy every column into owned storage.
    pub fn to_owned_row(&self) -> OwnedRow {
        OwnedRow {
            columns: self.columns.iter().map(|c| c.to_vec()).collect(),
        }
    }
}

impl fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.columns.iter().map(|c| String::from_utf8_lossy(c)))
            .finish()
    }
}

/// A row whose columns own their bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnedRow {
    pub columns: Vec<Vec<u8>>,
}

impl OwnedRow {
    pub fn new<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            columns: columns.into_iter().map(|c| c.as_ref().to_vec()).collect(),
        }
    }
}

/// A caller-asserted column count for incoming rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnCount {
    Exact(usize),
    AtLeast(usize),
}

impl Default for ColumnCount {
    fn default() -> Self {
        ColumnCount::AtLeast(1)
    }
}

impl ColumnCount {
    /// Check `found` columns for row number `row`.
    pub fn check(self, found: usize, row: u64) -> Result<(), PipelineError> {
        let ok = match self {
            ColumnCount::Exact(n) => found == n,
            ColumnCount::AtLeast(n) => found >= n,
        };
        if ok {
            Ok(())
        } else {
            Err(PipelineError::ColumnCount {
                row,
                expected: self.to_string(),
                found,
            })
        }
    }
}

impl fmt::Display for ColumnCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnCount::Exact(n) => write!(f, "exactly {n}"),
            ColumnCount::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}
