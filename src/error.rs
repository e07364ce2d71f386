//! Fatal error taxonomy for row pipelines.
//!
//! Every fallible operation in the crate returns [`anyhow::Result`]. Conditions that
//! terminate a run are raised as a [`PipelineError`] so the binary can recover the
//! category with [`anyhow::Error::downcast_ref`] and pick an exit code. There is no
//! retry or skip-and-continue anywhere: the first error aborts the run.

use std::io;
use thiserror::Error;

/// Broad category of a fatal error, used to choose the process exit code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Bad command-line arguments, detected before any input is read.
    Usage,
    /// Wrong column count or value width in a row.
    Schema,
    /// Zipped sources of different lengths.
    Alignment,
    /// Short read, short write, truncated input, closed sink.
    Io,
}

/// A fatal pipeline condition.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("row {row}: expected {expected} columns, found {found}")]
    ColumnCount {
        row: u64,
        expected: String,
        found: usize,
    },

    #[error("row {row}: more than {max} columns (found {found})", max = crate::row::MAX_COLUMNS)]
    TooManyColumns { row: u64, found: usize },

    #[error("column of {len} bytes exceeds the bsv limit of {max} bytes", max = u16::MAX)]
    ColumnTooLong { len: usize },

    #[error("row {row}: value column must be exactly 8 bytes, found {found}")]
    ValueWidth { row: u64, found: usize },

    #[error("row {row}: need at least 2 columns to aggregate, found {found}")]
    MissingValueColumn { row: u64, found: usize },

    #[error("row {row}: all columns didn't end at the same length ({stopped} of {sources} sources ended)")]
    Alignment {
        row: u64,
        stopped: usize,
        sources: usize,
    },

    #[error("row {row}: input ended mid-row at byte offset {offset}")]
    TruncatedRow { row: u64, offset: u64 },

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    pub fn usage(message: impl Into<String>) -> Self {
        PipelineError::Usage(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Usage(_) => ErrorKind::Usage,
            PipelineError::ColumnCount { .. }
            | PipelineError::TooManyColumns { .. }
            | PipelineError::ColumnTooLong { .. }
            | PipelineError::ValueWidth { .. }
            | PipelineError::MissingValueColumn { .. } => ErrorKind::Schema,
            PipelineError::Alignment { .. } => ErrorKind::Alignment,
            PipelineError::TruncatedRow { .. } | PipelineError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Find the [`ErrorKind`] of an error chain, if any link is a [`PipelineError`]
/// or a bare [`io::Error`].
pub fn kind_of(err: &anyhow::Error) -> Option<ErrorKind> {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<PipelineError>() {
            return Some(e.kind());
        }
        if cause.downcast_ref::<io::Error>().is_some() {
            return Some(ErrorKind::Io);
        }
    }
    None
}

pub fn to_exit_code(kind: Option<ErrorKind>) -> i32 {
    match kind {
        None => 1,
        Some(ErrorKind::Usage) => 2,
        Some(ErrorKind::Schema) => 3,
        Some(ErrorKind::Alignment) => 4,
        Some(ErrorKind::Io) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (None, 1),
            (Some(ErrorKind::Usage), 2),
            (Some(ErrorKind::Schema), 3),
            (Some(ErrorKind::Alignment), 4),
            (Some(ErrorKind::Io), 5),
        ];
        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn kind_survives_context() {
        let err = Err::<(), _>(PipelineError::Alignment {
            row: 3,
            stopped: 1,
            sources: 2,
        })
        .context("zip sources")
        .unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::Alignment));

        let io = Err::<(), _>(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .context("flush")
            .unwrap_err();
        assert_eq!(kind_of(&io), Some(ErrorKind::Io));

        assert_eq!(kind_of(&anyhow::anyhow!("plain")), None);
    }
}
