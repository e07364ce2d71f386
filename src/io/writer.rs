//! Buffered output with fan-out to several sinks.
//!
//! [`RowWriter`] collects bytes in one buffer and hands the whole buffer to every
//! sink when it fills up or on [`flush`](RowWriter::flush). All sinks see identical
//! bytes in identical order. Any sink error fails the write; there is no partial
//! recovery.
//!
//! Callers end a writer with [`finish`](RowWriter::finish), which also closes
//! compressed streams, or with [`discard`](RowWriter::discard) when the run has
//! already failed. Dropping a writer that still holds bytes is a bug: debug builds
//! panic, release builds log a warning.

use anyhow::{Context, Result};
use std::fs::{File, create_dir_all};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

use crate::io::compression::{FinishWrite, auto_detect_writer, plain_writer, wrap_writer};

/// Default output buffer size.
pub const WRITE_BUFFER_SIZE: usize = 5 * 1024 * 1024;

/// A named output sink.
pub struct Sink {
    pub name: String,
    writer: Box<dyn FinishWrite>,
}

impl Sink {
    pub fn new(name: impl Into<String>, writer: impl Write + 'static) -> Self {
        Self {
            name: name.into(),
            writer: plain_writer(writer),
        }
    }

    /// Any writer, compressed with the named codec.
    pub fn with_codec(
        name: impl Into<String>,
        writer: impl Write + 'static,
        codec: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            writer: wrap_writer(writer, codec)?,
        })
    }

    /// Standard output, optionally compressed with the named codec.
    pub fn stdout(codec: Option<&str>) -> Result<Self> {
        Self::with_codec("<stdout>", io::stdout(), codec)
    }

    /// Create (truncate) a file, creating parent directories as needed.
    ///
    /// With no codec, compression is chosen from the file extension.
    pub fn create(path: impl AsRef<Path>, codec: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let writer = match codec {
            Some(_) => wrap_writer(f, codec),
            None => auto_detect_writer(f, path),
        }
        .with_context(|| format!("setup compression for {}", path.display()))?;
        Ok(Self {
            name: path.display().to_string(),
            writer,
        })
    }
}

pub struct RowWriter {
    sinks: Vec<Sink>,
    buf: Vec<u8>,
    capacity: usize,
    bytes_written: u64,
}

impl RowWriter {
    pub fn new(sinks: Vec<Sink>) -> Self {
        Self::with_capacity(sinks, WRITE_BUFFER_SIZE)
    }

    pub fn with_capacity(sinks: Vec<Sink>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sinks,
            buf: Vec::with_capacity(capacity),
            capacity,
            bytes_written: 0,
        }
    }

    /// Bytes buffered but not yet handed to the sinks.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Bytes handed to each sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append bytes, flushing first if they would overflow the buffer.
    ///
    /// Writes larger than the whole buffer go straight to the sinks.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.buf.len() + bytes.len() > self.capacity {
            self.flush()?;
        }
        if bytes.len() > self.capacity {
            return self.write_through(bytes);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Hand all buffered bytes to every sink and flush them.
    pub fn flush(&mut self) -> Result<()> {
        let buf = std::mem::take(&mut self.buf);
        let result = self.write_through(&buf);
        self.buf = buf;
        self.buf.clear();
        result?;
        for sink in &mut self.sinks {
            sink.writer
                .flush()
                .with_context(|| format!("flush {}", sink.name))?;
        }
        Ok(())
    }

    fn write_through(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        for sink in &mut self.sinks {
            sink.writer
                .write_all(bytes)
                .with_context(|| format!("write {} bytes to {}", bytes.len(), sink.name))?;
        }
        self.bytes_written += bytes.len() as u64;
        debug!(bytes = bytes.len(), sinks = self.sinks.len(), "flushed output");
        Ok(())
    }

    /// Flush and close every sink, returning the total bytes written.
    ///
    /// Closing writes compression trailers; a failure there fails the call.
    pub fn finish(mut self) -> Result<u64> {
        self.flush()?;
        for sink in self.sinks.drain(..) {
            let name = sink.name;
            sink.writer
                .finish()
                .with_context(|| format!("close {name}"))?;
        }
        Ok(self.bytes_written)
    }

    /// Drop buffered bytes without writing them, for runs that already failed.
    pub fn discard(mut self) {
        if !self.buf.is_empty() {
            debug!(bytes = self.buf.len(), "discarded buffered output");
            self.buf.clear();
        }
    }
}

impl Drop for RowWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        warn!(bytes = self.buf.len(), "output writer dropped with unflushed bytes");
        debug_assert!(
            std::thread::panicking(),
            "output writer dropped with {} unflushed bytes",
            self.buf.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SharedBuffer;

    #[test]
    fn buffers_until_capacity() -> Result<()> {
        let out = SharedBuffer::new();
        let mut w = RowWriter::with_capacity(vec![out.sink("mem")], 8);
        w.write_bytes(b"abc")?;
        w.write_bytes(b"def")?;
        assert!(out.is_empty());
        assert_eq!(w.pending(), 6);
        w.write_bytes(b"ghi")?;
        assert_eq!(out.bytes(), b"abcdef");
        w.write_bytes(b"0123456789")?;
        assert_eq!(out.bytes(), b"abcdefghi0123456789");
        assert_eq!(w.pending(), 0);
        assert_eq!(w.finish()?, 19);
        Ok(())
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "dropped with 3 unflushed bytes")]
    fn dropping_pending_bytes_panics_in_debug_builds() {
        let out = SharedBuffer::new();
        let mut w = RowWriter::new(vec![out.sink("mem")]);
        w.write_bytes(b"abc").expect("buffered");
        drop(w);
    }

    #[test]
    fn discard_drops_pending_bytes_quietly() -> Result<()> {
        let out = SharedBuffer::new();
        let mut w = RowWriter::new(vec![out.sink("mem")]);
        w.write_bytes(b"abc")?;
        w.discard();
        assert!(out.is_empty());
        Ok(())
    }
}
