//! Helpers for testing row pipelines.
//!
//! - [`SharedBuffer`]: an in-memory sink whose bytes stay readable after the writer is gone
//! - [`bsv_bytes`] / [`csv_bytes`]: build encoded input from literal rows
//! - [`read_all`], [`decode_bsv`], [`decode_csv`]: collect rows into owned form
//! - [`assert_rows_equal`] / [`assert_rows_unordered_equal`]: compare row sets
//! - [`sample_trips_csv`]: a small 8-column fixture
//! - [`temp_dir`] / [`write_file`]: on-disk fixtures
//!
//! ```
//! use rowbeam::testing::*;
//!
//! let bytes = bsv_bytes(&[&[b"a", b"1"], &[b"b", b"2"]]);
//! let rows = decode_bsv(&bytes, 2).unwrap();
//! assert_rows_equal(&rows, &owned(&[&[b"a", b"1"], &[b"b", b"2"]]));
//! ```

use anyhow::Result;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

use crate::io::RowRead;
use crate::io::bsv::{BsvReader, encode_columns};
use crate::io::delimited::DelimitedReader;
use crate::io::stream::{ByteStream, Source};
use crate::io::writer::Sink;
use crate::row::OwnedRow;

/// A cloneable in-memory sink. Every clone appends to the same buffer.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`Sink`] writing into this buffer.
    pub fn sink(&self, name: &str) -> Sink {
        Sink::new(name, self.clone())
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Convert literal rows to [`OwnedRow`]s.
pub fn owned(rows: &[&[&[u8]]]) -> Vec<OwnedRow> {
    rows.iter().map(|r| OwnedRow::new(r.iter())).collect()
}

/// Encode literal rows as BSV.
///
/// # Panics
/// If a column is longer than the BSV limit.
pub fn bsv_bytes(rows: &[&[&[u8]]]) -> Vec<u8> {
    let mut out = Vec::new();
    for row in rows {
        encode_columns(row.iter().copied(), &mut out).expect("column fits in bsv");
    }
    out
}

/// Join literal rows with `,` and end each with `\n`.
pub fn csv_bytes(rows: &[&[&[u8]]]) -> Vec<u8> {
    let mut out = Vec::new();
    for row in rows {
        out.extend_from_slice(&row.join(&b","[..]));
        out.push(b'\n');
    }
    out
}

/// Drain a reader into owned rows.
pub fn read_all(reader: &mut dyn RowRead) -> Result<Vec<OwnedRow>> {
    let mut rows = Vec::new();
    while let Some(row) = reader.read_row()? {
        rows.push(row.to_owned_row());
    }
    Ok(rows)
}

/// Decode BSV bytes holding rows of exactly `columns` columns.
pub fn decode_bsv(bytes: &[u8], columns: usize) -> Result<Vec<OwnedRow>> {
    let stream = ByteStream::single(Source::from_bytes("<test>", bytes));
    read_all(&mut BsvReader::new(stream, columns))
}

/// Decode comma-separated text.
pub fn decode_csv(bytes: &[u8]) -> Result<Vec<OwnedRow>> {
    let stream = ByteStream::single(Source::from_bytes("<test>", bytes));
    read_all(&mut DelimitedReader::new(stream))
}

/// Assert two row lists are equal, in order.
///
/// # Panics
/// On the first differing row, printing both rows as lossy UTF-8.
pub fn assert_rows_equal(actual: &[OwnedRow], expected: &[OwnedRow]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Row count mismatch:\n  Expected: {}\n  Actual: {}\n  Expected rows: {:?}\n  Actual rows: {:?}",
        expected.len(),
        actual.len(),
        render(expected),
        render(actual)
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(
            a,
            e,
            "Row mismatch at index {i}:\n  Expected: {:?}\n  Actual: {:?}",
            render(std::slice::from_ref(e)),
            render(std::slice::from_ref(a))
        );
    }
}

/// Assert two row lists hold the same rows, ignoring order.
pub fn assert_rows_unordered_equal(actual: &[OwnedRow], expected: &[OwnedRow]) {
    let mut actual = actual.to_vec();
    let mut expected = expected.to_vec();
    actual.sort();
    expected.sort();
    assert_rows_equal(&actual, &expected);
}

fn render(rows: &[OwnedRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            r.columns
                .iter()
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect()
        })
        .collect()
}

/// Ten 8-column trip records; three have a first column starting with `f`.
#[must_use]
pub fn sample_trips_csv() -> Vec<u8> {
    let rows: [[&str; 8]; 10] = [
        ["fare", "2019-01-01", "09:00", "jfk", "lga", "12.50", "2", "card"],
        ["trip", "2019-01-01", "09:05", "lga", "ewr", "40.00", "1", "cash"],
        ["trip", "2019-01-01", "09:12", "ewr", "jfk", "55.25", "3", "card"],
        ["fare", "2019-01-01", "09:30", "jfk", "jfk", "8.00", "1", "card"],
        ["toll", "2019-01-01", "09:41", "lga", "lga", "6.50", "1", "cash"],
        ["trip", "2019-01-02", "10:02", "jfk", "ewr", "61.75", "2", "card"],
        ["trip", "2019-01-02", "10:15", "ewr", "lga", "38.10", "4", "cash"],
        ["flat", "2019-01-02", "11:00", "jfk", "mhtn", "52.00", "1", "card"],
        ["trip", "2019-01-02", "11:20", "mhtn", "jfk", "49.90", "2", "card"],
        ["toll", "2019-01-02", "11:45", "ewr", "ewr", "15.00", "1", "cash"],
    ];
    let mut out = Vec::new();
    for row in rows {
        out.extend_from_slice(row.join(",").as_bytes());
        out.push(b'\n');
    }
    out
}

/// A fresh temporary directory, removed on drop.
pub fn temp_dir() -> Result<TempDir> {
    Ok(tempfile::tempdir()?)
}

/// Write `bytes` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}
