//! Row output in either text or BSV form.

use anyhow::Result;

use crate::io::Format;
use crate::io::bsv;
use crate::io::writer::RowWriter;
use crate::row::Row;

/// A [`RowWriter`] plus the representation rows are written in.
pub struct RowOutput {
    writer: RowWriter,
    format: Format,
    delimiter: u8,
    rows: u64,
}

impl RowOutput {
    pub fn new(writer: RowWriter, format: Format, delimiter: u8) -> Self {
        Self {
            writer,
            format,
            delimiter,
            rows: 0,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Write one row given as a sequence of columns.
    ///
    /// Text rows are the columns joined by the delimiter and ended with `\n`.
    pub fn write_columns<'c, I>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = &'c [u8]>,
    {
        match self.format {
            Format::Bsv => bsv::write_columns(&mut self.writer, columns)?,
            Format::Csv => {
                for (i, column) in columns.into_iter().enumerate() {
                    if i > 0 {
                        self.writer.write_bytes(&[self.delimiter])?;
                    }
                    self.writer.write_bytes(column)?;
                }
                self.writer.write_bytes(b"\n")?;
            }
        }
        self.rows += 1;
        Ok(())
    }

    pub fn write_row(&mut self, row: &Row<'_>) -> Result<()> {
        self.write_columns(row.iter())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }

    /// Flush and close the sinks; returns `(rows, bytes)` written.
    pub fn finish(self) -> Result<(u64, u64)> {
        let rows = self.rows;
        let bytes = self.writer.finish()?;
        Ok((rows, bytes))
    }

    /// Drop buffered rows unwritten; see [`RowWriter::discard`].
    pub fn discard(self) {
        self.writer.discard();
    }
}
