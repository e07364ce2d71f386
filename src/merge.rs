//! Column selection and the N-way zip merge.
//!
//! [`ZipMerge`] reads one single-column BSV row from each of N sources per step and
//! assembles them into one N-column row. All sources must run out on the same step;
//! if only some of them do, the merge fails with [`PipelineError::Alignment`].

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

use crate::error::PipelineError;
use crate::io::RowRead;
use crate::io::bsv::BsvReader;
use crate::io::stream::{ByteStream, Source};
use crate::row::{ColumnCount, Row};

const SELECTION_HINT: &str = "bad column selection, should be like: '1,2,3'";

/// An ordered, duplicate-free list of zero-based column (or source) indices.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selection(Vec<usize>);

impl Selection {
    /// Parse a comma-separated list of 1-based indices such as `"3,1"`.
    ///
    /// # Errors
    /// [`PipelineError::Usage`] for an empty list, a non-numeric entry, an index
    /// below 1, or a repeated index.
    pub fn parse(text: &str) -> Result<Self, PipelineError> {
        let mut indices = Vec::new();
        let mut seen = HashSet::new();
        for part in text.split(',') {
            let column: usize = part.trim().parse().map_err(|_| {
                PipelineError::usage(format!("{SELECTION_HINT}, got '{part}'"))
            })?;
            if column == 0 {
                return Err(PipelineError::usage(format!(
                    "{SELECTION_HINT} and cannot select below column 1"
                )));
            }
            if !seen.insert(column) {
                return Err(PipelineError::usage(format!(
                    "can only select columns once, got dupe for column: {column}"
                )));
            }
            indices.push(column - 1);
        }
        Ok(Self(indices))
    }

    /// Every index of `n`, in order.
    pub fn all(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// Parse `text`, or select everything when absent, and check against `n`.
    pub fn parse_or_all(text: Option<&str>, n: usize) -> Result<Self, PipelineError> {
        let selection = match text {
            Some(text) => Self::parse(text)?,
            None => Self::all(n),
        };
        selection.validate(n)?;
        Ok(selection)
    }

    /// Check every index is below `n`.
    pub fn validate(&self, n: usize) -> Result<(), PipelineError> {
        match self.0.iter().find(|&&i| i >= n) {
            Some(_) => Err(PipelineError::usage(format!(
                "{SELECTION_HINT} and cannot select above column {n}"
            ))),
            None => Ok(()),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The column count a row needs for every selected index to exist.
    pub fn required_columns(&self) -> ColumnCount {
        ColumnCount::AtLeast(self.0.iter().max().map_or(1, |m| m + 1))
    }
}

/// Zips single-column sources into multi-column rows.
pub struct ZipMerge {
    sources: Vec<BsvReader>,
    stops: Vec<bool>,
    rows: u64,
}

impl ZipMerge {
    /// Zip already-open single-column readers, in the given order.
    ///
    /// # Errors
    /// [`PipelineError::Usage`] if `sources` is empty.
    pub fn new(sources: Vec<BsvReader>) -> Result<Self, PipelineError> {
        if sources.is_empty() {
            return Err(PipelineError::usage("need at least one column source"));
        }
        let stops = vec![false; sources.len()];
        Ok(Self {
            sources,
            stops,
            rows: 0,
        })
    }

    /// Open every path, then zip the selected ones in selection order.
    ///
    /// All paths are opened so a missing file fails before any row is read.
    pub fn open(paths: &[PathBuf], selection: &Selection, codec: Option<&str>) -> Result<Self> {
        selection.validate(paths.len())?;
        let mut opened = paths
            .iter()
            .map(|path| {
                let source = Source::open(path, codec)?;
                Ok(Some(BsvReader::new(ByteStream::single(source), 1)))
            })
            .collect::<Result<Vec<_>>>()?;
        let sources = selection
            .indices()
            .iter()
            .map(|&i| {
                opened[i]
                    .take()
                    .with_context(|| format!("column source {} selected twice", i + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(files = paths.len(), selected = sources.len(), "opened column sources");
        Ok(Self::new(sources)?)
    }

    /// Number of zipped sources (columns per output row).
    pub fn width(&self) -> usize {
        self.sources.len()
    }

    /// Read one row from every source and combine them.
    ///
    /// Returns `Ok(None)` once all sources have ended together.
    ///
    /// # Errors
    /// [`PipelineError::Alignment`] when some but not all sources have ended; the
    /// row number is the first row a source could not supply.
    pub fn next_row(&mut self) -> Result<Option<Row<'_>>> {
        let row = self.rows + 1;
        let mut columns = Vec::with_capacity(self.sources.len());
        for (source, stop) in self.sources.iter_mut().zip(self.stops.iter_mut()) {
            match source.load_next(1)? {
                Some(single) => {
                    *stop = false;
                    columns.extend(single.column(0));
                }
                None => *stop = true,
            }
        }

        let stopped = self.stops.iter().filter(|&&s| s).count();
        if stopped == self.stops.len() {
            return Ok(None);
        }
        if stopped > 0 {
            let ended: Vec<String> = (1..=self.stops.len())
                .filter(|&i| self.stops[i - 1])
                .map(|i| i.to_string())
                .collect();
            return Err(anyhow::Error::new(PipelineError::Alignment {
                row,
                stopped,
                sources: self.stops.len(),
            })
            .context(format!("sources ended early: {}", ended.join(","))));
        }

        self.rows = row;
        Ok(Some(Row::new(columns, row)?))
    }
}

impl RowRead for ZipMerge {
    fn read_row(&mut self) -> Result<Option<Row<'_>>> {
        self.next_row()
    }

    fn rows_read(&self) -> u64 {
        self.rows
    }
}
