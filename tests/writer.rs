use anyhow::Result;
use rowbeam::error::{ErrorKind, kind_of};
use rowbeam::io::writer::{RowWriter, Sink, WRITE_BUFFER_SIZE};
use rowbeam::testing::{SharedBuffer, temp_dir};
use std::io::{self, Write};

/// A sink that accepts `limit` bytes and then fails.
struct Closing {
    limit: usize,
}

impl Write for Closing {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.len() > self.limit {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
        }
        self.limit -= buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn every_sink_sees_identical_bytes() -> Result<()> {
    let a = SharedBuffer::new();
    let b = SharedBuffer::new();
    let mut w = RowWriter::with_capacity(vec![a.sink("a"), b.sink("b")], 7);
    for chunk in ["one,", "two,", "three\n", "a-much-longer-chunk\n"] {
        w.write_bytes(chunk.as_bytes())?;
    }
    let written = w.finish()?;
    assert_eq!(a.bytes(), b"one,two,three\na-much-longer-chunk\n");
    assert_eq!(a.bytes(), b.bytes());
    assert_eq!(written, a.len() as u64);
    Ok(())
}

#[test]
fn nothing_reaches_the_sink_before_flush() -> Result<()> {
    let out = SharedBuffer::new();
    let mut w = RowWriter::new(vec![out.sink("mem")]);
    w.write_bytes(&vec![b'x'; WRITE_BUFFER_SIZE - 1])?;
    assert!(out.is_empty());
    w.write_bytes(b"yy")?;
    assert_eq!(out.len(), WRITE_BUFFER_SIZE - 1);
    w.flush()?;
    assert_eq!(out.len(), WRITE_BUFFER_SIZE + 1);
    assert_eq!(w.pending(), 0);
    Ok(())
}

#[test]
fn a_failing_sink_fails_the_write() {
    let mut w = RowWriter::with_capacity(vec![Sink::new("closed", Closing { limit: 4 })], 8);
    w.write_bytes(b"abcdef").expect("buffered");
    let err = w.flush().unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::Io));
    assert!(format!("{err:#}").contains("closed"));
}

/// A sink that accepts writes until it has been flushed once.
#[cfg(feature = "compression-gzip")]
struct ClosesAfterFlush {
    flushed: bool,
}

#[cfg(feature = "compression-gzip")]
impl Write for ClosesAfterFlush {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.flushed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushed = true;
        Ok(())
    }
}

#[cfg(feature = "compression-gzip")]
#[test]
fn a_failed_compression_trailer_fails_finish() -> Result<()> {
    let sink = Sink::with_codec("gz", ClosesAfterFlush { flushed: false }, Some("gzip"))?;
    let mut w = RowWriter::new(vec![sink]);
    w.write_bytes(b"a,b\n")?;
    let err = w.finish().unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::Io));
    assert!(format!("{err:#}").contains("close gz"));
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn finish_completes_compressed_streams() -> Result<()> {
    use std::io::Read;

    let out = SharedBuffer::new();
    let mut w = RowWriter::new(vec![Sink::with_codec("mem", out.clone(), Some("gzip"))?]);
    w.write_bytes(b"a,b\n")?;
    w.finish()?;
    let mut back = String::new();
    flate2::read::GzDecoder::new(&out.bytes()[..]).read_to_string(&mut back)?;
    assert_eq!(back, "a,b\n");
    Ok(())
}

#[test]
fn file_sinks_create_parent_directories() -> Result<()> {
    let dir = temp_dir()?;
    let path = dir.path().join("nested/out/rows.csv");
    let mut w = RowWriter::new(vec![Sink::create(&path, None)?]);
    w.write_bytes(b"a,b\n")?;
    assert_eq!(w.finish()?, 4);
    assert_eq!(std::fs::read(&path)?, b"a,b\n");
    Ok(())
}
