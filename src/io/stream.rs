//! A buffered byte stream over one or more sources read back to back.
//!
//! [`ByteStream`] owns a single read buffer. Readers either use the high-level
//! [`read_exact`](ByteStream::read_exact) / [`read_until`](ByteStream::read_until)
//! calls, or the low-level [`ensure`](ByteStream::ensure) / [`consume`](ByteStream::consume)
//! pair when a record is made of several pieces that must all stay valid at once.
//! Offsets passed to `ensure` are relative to the first unconsumed byte, so they stay
//! valid while the buffer is compacted or grown.
//!
//! Source boundaries are visible: `ensure` never reads past the end of the current
//! source, and [`next_source`](ByteStream::next_source) moves on once the caller has
//! drained it. A record never spans two sources.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

use crate::error::PipelineError;
use crate::io::compression::{auto_detect_reader, wrap_reader};

/// Default read buffer size (grows if a single record needs more).
pub const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// One named underlying byte source.
pub struct Source {
    pub name: String,
    reader: Box<dyn Read>,
}

impl Source {
    pub fn new(name: impl Into<String>, reader: impl Read + 'static) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(reader),
        }
    }

    /// Standard input, optionally decompressed with the named codec.
    pub fn stdin(codec: Option<&str>) -> Result<Self> {
        let reader = wrap_reader(io::stdin(), codec)?;
        Ok(Self {
            name: "<stdin>".into(),
            reader,
        })
    }

    /// Open a file. With no codec, compression is auto-detected from the
    /// extension or magic bytes.
    pub fn open(path: impl AsRef<Path>, codec: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let reader = match codec {
            Some(_) => wrap_reader(f, codec),
            None => auto_detect_reader(f, path),
        }
        .with_context(|| format!("setup decompression for {}", path.display()))?;
        debug!(path = %path.display(), codec = codec.unwrap_or("auto"), "opened source");
        Ok(Self {
            name: path.display().to_string(),
            reader,
        })
    }

    /// An in-memory source.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(name, io::Cursor::new(bytes.into()))
    }
}

/// Logical stream over sources read in order.
pub struct ByteStream {
    sources: VecDeque<Source>,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
    /// Bytes consumed so far across all sources.
    position: u64,
}

impl ByteStream {
    pub fn new(sources: impl IntoIterator<Item = Source>) -> Self {
        Self::with_capacity(sources, READ_BUFFER_SIZE)
    }

    pub fn with_capacity(sources: impl IntoIterator<Item = Source>, capacity: usize) -> Self {
        let sources: VecDeque<Source> = sources.into_iter().collect();
        let eof = sources.is_empty();
        Self {
            sources,
            buf: vec![0; capacity.max(16)],
            start: 0,
            end: 0,
            eof,
            position: 0,
        }
    }

    /// Stream over a single source.
    pub fn single(source: Source) -> Self {
        Self::new([source])
    }

    /// Bytes consumed since the stream was created.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Name of the source currently being read, if any.
    pub fn source_name(&self) -> Option<&str> {
        self.sources.front().map(|s| s.name.as_str())
    }

    /// Buffered, unconsumed bytes of the current source.
    pub fn available(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    /// Buffer at least `n` bytes of the current source, reading as needed.
    ///
    /// Returns the number of bytes available, which is less than `n` only when the
    /// current source is exhausted.
    pub fn ensure(&mut self, n: usize) -> io::Result<usize> {
        while self.end - self.start < n && !self.eof {
            self.make_room(n);
            let Some(source) = self.sources.front_mut() else {
                self.eof = true;
                break;
            };
            match source.reader.read(&mut self.buf[self.end..]) {
                Ok(0) => self.eof = true,
                Ok(read) => self.end += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(self.end - self.start)
    }

    /// Compact consumed bytes away and grow so that `n` unconsumed bytes fit.
    fn make_room(&mut self, n: usize) {
        if self.end < self.buf.len() && self.start + n <= self.buf.len() {
            return;
        }
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        if n > self.buf.len() || self.end == self.buf.len() {
            let grown = n.max(self.buf.len() * 2);
            self.buf.resize(grown, 0);
        }
    }

    /// Mark `n` available bytes consumed and return them.
    ///
    /// The returned slice stays valid until the next call that takes `&mut self`.
    ///
    /// # Panics
    /// Panics if fewer than `n` bytes are available; callers `ensure` first.
    pub fn consume(&mut self, n: usize) -> &[u8] {
        assert!(n <= self.end - self.start, "consume past buffered data");
        let from = self.start;
        self.start += n;
        self.position += n as u64;
        &self.buf[from..from + n]
    }

    /// Move on to the next source once the current one is exhausted and drained.
    ///
    /// Returns false when there are no more sources.
    pub fn next_source(&mut self) -> bool {
        if let Some(done) = self.sources.pop_front() {
            debug!(source = %done.name, position = self.position, "source finished");
        }
        self.start = 0;
        self.end = 0;
        self.eof = self.sources.is_empty();
        !self.eof
    }

    /// Make sure the next byte of input is buffered, crossing source boundaries.
    ///
    /// Returns false at the end of the last source.
    pub fn fill(&mut self) -> io::Result<bool> {
        loop {
            if self.ensure(1)? > 0 {
                return Ok(true);
            }
            if !self.next_source() {
                return Ok(false);
            }
        }
    }

    /// Read exactly `n` bytes.
    ///
    /// Returns `None` if the stream is at a clean end (no bytes left in any
    /// source). Fails with [`PipelineError::TruncatedRow`] if the current source
    /// ends after some but not all of the bytes.
    pub fn read_exact(&mut self, n: usize) -> Result<Option<&[u8]>> {
        if !self.fill()? {
            return Ok(None);
        }
        if self.ensure(n)? < n {
            return Err(PipelineError::TruncatedRow {
                row: 0,
                offset: self.position,
            }
            .into());
        }
        Ok(Some(self.consume(n)))
    }

    /// Read up to the next `delim` byte, returning the bytes before it.
    ///
    /// The delimiter is consumed but not returned. The end of a source also ends
    /// the record, so a file without a trailing delimiter still yields its last
    /// record. Returns `None` when all sources are exhausted.
    pub fn read_until(&mut self, delim: u8) -> Result<Option<&[u8]>> {
        if !self.fill()? {
            return Ok(None);
        }
        let mut scanned = 0;
        loop {
            let available = self.end - self.start;
            if let Some(i) = self.buf[self.start + scanned..self.end]
                .iter()
                .position(|&b| b == delim)
            {
                let len = scanned + i;
                let record = self.consume(len + 1);
                return Ok(Some(&record[..len]));
            }
            scanned = available;
            if self.ensure(available + 1)? == available {
                // current source ended without a trailing delimiter
                return Ok(Some(self.consume(available)));
            }
        }
    }
}
