//! Row transforms: count, select, reverse, convert, zip, sum, unzip.
//!
//! Each transform pulls rows from a [`RowRead`], does its work, and pushes rows to a
//! [`RowOutput`] (or returns a count). Column-count assertions live in the readers;
//! a transform only sees rows that already satisfy them.

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::aggregate::SumAggregator;
use crate::io::RowRead;
use crate::io::bsv;
use crate::io::output::RowOutput;
use crate::io::writer::{RowWriter, Sink, WRITE_BUFFER_SIZE};
use crate::merge::{Selection, ZipMerge};
use crate::row::{ColumnCount, Row};

/// Count rows whose first column starts with `byte`.
pub fn count(input: &mut dyn RowRead, byte: u8) -> Result<u64> {
    let mut count = 0;
    while let Some(row) = input.read_row()? {
        if row.column(0).and_then(<[u8]>::first) == Some(&byte) {
            count += 1;
        }
    }
    info!(rows = input.rows_read(), count, "count finished");
    Ok(count)
}

/// Write the selected columns of every row, in selection order.
pub fn select(input: &mut dyn RowRead, selection: &Selection, out: &mut RowOutput) -> Result<u64> {
    let required = selection.required_columns();
    let mut rows = 0;
    while let Some(row) = input.read_row()? {
        rows += 1;
        required.check(row.len(), rows)?;
        out.write_columns(selection.indices().iter().map(|&i| row.columns()[i]))?;
    }
    info!(rows, "select finished");
    Ok(rows)
}

/// Write every row with its columns in reverse order.
pub fn reverse(input: &mut dyn RowRead, out: &mut RowOutput) -> Result<u64> {
    let mut rows = 0;
    while let Some(row) = input.read_row()? {
        out.write_columns(row.iter().rev())?;
        rows += 1;
    }
    info!(rows, "reverse finished");
    Ok(rows)
}

/// Copy rows unchanged; with different input and output formats this converts
/// between text and BSV.
pub fn convert(input: &mut dyn RowRead, out: &mut RowOutput) -> Result<u64> {
    let mut rows = 0;
    while let Some(row) = input.read_row()? {
        out.write_row(&row)?;
        rows += 1;
    }
    info!(rows, "convert finished");
    Ok(rows)
}

/// Write one composite row per zip step.
pub fn zip(merge: &mut ZipMerge, out: &mut RowOutput) -> Result<u64> {
    let mut rows = 0;
    while let Some(row) = merge.next_row()? {
        out.write_row(&row)?;
        rows += 1;
    }
    info!(rows, columns = merge.width(), "zip finished");
    Ok(rows)
}

/// Zip the sources, sum column 1 per distinct column 0, and dump the sums.
///
/// Returns the number of distinct keys written.
pub fn zip_sum(merge: &mut ZipMerge, mut agg: SumAggregator, out: &mut RowOutput) -> Result<u64> {
    while let Some(row) = merge.next_row()? {
        agg.add_row(&row)?;
    }
    let rows = agg.rows();
    let keys = agg.dump(out)?;
    info!(rows, keys, "sum finished");
    Ok(keys)
}

/// Split rows into one single-column BSV file per (selected) column.
///
/// Files are named `<prefix>_<n>` with `n` the 1-based column number, zero-padded
/// to the width of the column count so that sorted names keep column order. Every
/// row must have as many columns as the first one, and the selection (all columns
/// when `None`) is checked against that count. Returns the created paths, in
/// selection order; no files are created for empty input.
pub fn unzip(
    input: &mut dyn RowRead,
    prefix: &str,
    selection: Option<&Selection>,
    codec: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let (width, selection, paths, mut writers, first_written) = {
        let Some(first) = input.read_row()? else {
            return Ok(Vec::new());
        };
        let width = first.len();
        let selection = match selection {
            Some(selection) => {
                selection.validate(width)?;
                selection.clone()
            }
            None => Selection::all(width),
        };
        let digits = width.to_string().len();
        let capacity = (WRITE_BUFFER_SIZE / selection.len()).max(64 * 1024);

        let mut paths = Vec::with_capacity(selection.len());
        let mut writers = Vec::with_capacity(selection.len());
        for &i in selection.indices() {
            let path = PathBuf::from(format!("{prefix}_{:0digits$}", i + 1));
            writers.push(RowWriter::with_capacity(
                vec![Sink::create(&path, codec)?],
                capacity,
            ));
            paths.push(path);
        }
        let first_written = write_split(&first, &selection, &mut writers);
        (width, selection, paths, writers, first_written)
    };

    let rows = match first_written
        .and_then(|()| split_rest(input, width, &selection, &mut writers))
    {
        Ok(rows) => rows,
        Err(err) => {
            writers.into_iter().for_each(RowWriter::discard);
            return Err(err);
        }
    };
    let mut writers = writers.into_iter();
    for writer in writers.by_ref() {
        if let Err(err) = writer.finish() {
            writers.for_each(RowWriter::discard);
            return Err(err);
        }
    }
    info!(rows, files = paths.len(), "unzip finished");
    Ok(paths)
}

/// Split every row after the first; returns the total row count.
fn split_rest(
    input: &mut dyn RowRead,
    width: usize,
    selection: &Selection,
    writers: &mut [RowWriter],
) -> Result<u64> {
    let expect = ColumnCount::Exact(width);
    let mut rows = 1;
    while let Some(row) = input.read_row()? {
        rows += 1;
        expect.check(row.len(), rows)?;
        write_split(&row, selection, writers)?;
    }
    Ok(rows)
}

fn write_split(row: &Row<'_>, selection: &Selection, writers: &mut [RowWriter]) -> Result<()> {
    for (&i, writer) in selection.indices().iter().zip(writers.iter_mut()) {
        bsv::write_columns(writer, [row.columns()[i]])?;
    }
    Ok(())
}
