//! # Rowbeam
//!
//! A **zero-copy row pipeline toolkit**. Rowbeam streams rows of byte-string columns
//! from delimited text or a compact length-prefixed binary format (BSV), runs a
//! transform over them, and writes rows back out through one buffered, fan-out writer.
//!
//! ## Key Features
//!
//! - **Zero-copy rows** - a [`Row`] borrows its columns straight from the read buffer
//! - **Two wire formats** - delimited text and BSV, with conversion in both directions
//! - **Column-count assertions** - exact or minimum counts checked on every row
//! - **Zip merge** - combine N single-column BSV sources into N-column rows
//! - **Group-by-sum** - streaming per-key `f64` sums keyed on raw bytes
//! - **Tee output** - one writer feeding stdout and any number of files
//! - **Compression** - lz4, gzip, zstd, bzip2, and xz (each optional via feature flags)
//!
//! ## Quick Start
//!
//! ```
//! use rowbeam::io::delimited::DelimitedReader;
//! use rowbeam::io::stream::{ByteStream, Source};
//! use rowbeam::transforms;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let source = Source::from_bytes("<mem>", "fish,1\ntrip,2\nfern,3\n");
//! let mut reader = DelimitedReader::new(ByteStream::single(source));
//!
//! assert_eq!(transforms::count(&mut reader, b'f')?, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Rows
//!
//! Readers hand out rows through [`RowRead::read_row`]. The returned row borrows the
//! reader, so it is only valid until the next read; `None` marks end of input.
//!
//! ### Sources and streams
//!
//! A [`ByteStream`] reads one or more sources back to back. A record never spans two
//! sources: the end of a source ends a text record, and cutting a BSV row short is an
//! error.
//!
//! ### Output
//!
//! A [`RowWriter`] buffers bytes and hands the same bytes to every sink. A
//! [`RowOutput`] puts a format on top of it.
//!
//! ## Errors
//!
//! Everything returns [`anyhow::Result`]. Fatal conditions are [`PipelineError`]s;
//! [`error::kind_of`] and [`error::to_exit_code`] turn them into process exit codes.
//!
//! ## Modules
//!
//! - [`row`] - the row model and column-count assertions
//! - [`io`] - streams, readers, writers, codecs
//! - [`merge`] - column selection and zip merge
//! - [`aggregate`] - group-by-sum
//! - [`transforms`] - the row transforms behind each command
//! - [`metrics`] - run statistics
//! - [`testing`] - helpers for tests

pub mod aggregate;
pub mod error;
pub mod io;
pub mod merge;
pub mod metrics;
pub mod row;
pub mod testing;
pub mod transforms;

pub use aggregate::SumAggregator;
pub use error::{ErrorKind, PipelineError};
pub use io::output::RowOutput;
pub use io::stream::{ByteStream, Source};
pub use io::writer::{RowWriter, Sink};
pub use io::{Format, InputSpec, RowRead};
pub use merge::{Selection, ZipMerge};
pub use metrics::RunStats;
pub use row::{ColumnCount, OwnedRow, Row};
