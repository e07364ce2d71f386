//! Pluggable compression beneath row readers and writers.
//!
//! Compression is an opaque byte-stream filter: a codec wraps a `Read` or a `Write`
//! and nothing above it changes. Codecs are chosen by name on the command line
//! (`--codec lz4`), or, for named input files, detected from the file extension and
//! then from magic bytes.
//!
//! ## Built-in Codecs
//!
//! When enabled via feature flags, the following codecs are available:
//! - **Lz4** (`.lz4`) - frame format via `lz4_flex` (feature: `compression-lz4`)
//! - **Gzip** (`.gz`) - via `flate2` crate (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` crate (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) - via `bzip2` crate (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) - via `xz2` crate (feature: `compression-xz`)
//!
//! ## Finishing Writers
//!
//! Compressed writers must write a trailer when the stream ends, and that write can
//! fail like any other. Writers are returned as [`FinishWrite`] so the trailer is
//! written by an explicit [`finish`](FinishWrite::finish) whose error reaches the
//! caller.

use anyhow::{Context, Result};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::error::PipelineError;

/// A writer whose stream is closed explicitly.
pub trait FinishWrite: Write {
    /// Write any trailer and flush the underlying writer.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// An uncompressed writer; finishing only flushes.
struct Plain<W: Write>(W);

impl<W: Write> Write for Plain<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> FinishWrite for Plain<W> {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.0.flush()
    }
}

/// Box a writer that needs no trailer.
pub fn plain_writer<W: Write + 'static>(writer: W) -> Box<dyn FinishWrite> {
    Box::new(Plain(writer))
}

/// A compression algorithm that can wrap byte streams.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip", "lz4").
    fn name(&self) -> &str;

    /// File extensions associated with this codec (e.g., `&[".gz", ".gzip"]`).
    ///
    /// Extensions should include the leading dot and be lowercase.
    fn extensions(&self) -> &[&str];

    /// Optional magic byte signature for content-based detection.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap a reader with decompression.
    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;

    /// Wrap a writer with compression.
    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>>;
}

/// All codecs compiled into this build.
pub fn codecs() -> Vec<Box<dyn CompressionCodec>> {
    vec![
        #[cfg(feature = "compression-lz4")]
        Box::new(Lz4Codec),
        #[cfg(feature = "compression-gzip")]
        Box::new(GzipCodec),
        #[cfg(feature = "compression-zstd")]
        Box::new(ZstdCodec),
        #[cfg(feature = "compression-bzip2")]
        Box::new(Bzip2Codec),
        #[cfg(feature = "compression-xz")]
        Box::new(XzCodec),
    ]
}

/// Names of the available codecs, for help and error messages.
pub fn codec_names() -> Vec<String> {
    codecs().iter().map(|c| c.name().to_string()).collect()
}

/// Look up a codec by name (case-insensitive).
///
/// # Errors
/// Returns a [`PipelineError::Usage`] if no compiled-in codec has that name.
pub fn codec_by_name(name: &str) -> Result<Box<dyn CompressionCodec>> {
    let wanted = name.to_ascii_lowercase();
    codecs()
        .into_iter()
        .find(|c| c.name() == wanted)
        .ok_or_else(|| {
            PipelineError::usage(format!(
                "unknown codec '{name}', available: {}",
                codec_names().join(", ")
            ))
            .into()
        })
}

/// Detect compression codec from file path extension.
fn detect_from_extension(path: impl AsRef<Path>) -> Option<Box<dyn CompressionCodec>> {
    let path_str = path.as_ref().to_string_lossy().to_lowercase();
    codecs()
        .into_iter()
        .find(|codec| codec.extensions().iter().any(|ext| path_str.ends_with(ext)))
}

/// Detect compression codec from magic bytes at the start of a stream.
///
/// The reader is not advanced.
fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<Box<dyn CompressionCodec>> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    codecs().into_iter().find(|codec| {
        codec
            .magic_bytes()
            .is_some_and(|magic| buf.len() >= magic.len() && buf.starts_with(magic))
    })
}

/// Wrap a reader with the named codec, or pass it through when `codec` is `None`.
pub fn wrap_reader<R: Read + 'static>(reader: R, codec: Option<&str>) -> Result<Box<dyn Read>> {
    match codec {
        None => Ok(Box::new(reader)),
        Some(name) => {
            let codec = codec_by_name(name)?;
            codec
                .wrap_reader_dyn(Box::new(reader))
                .with_context(|| format!("wrap reader with {} codec", codec.name()))
        }
    }
}

/// Wrap a writer with the named codec, or pass it through when `codec` is `None`.
pub fn wrap_writer<W: Write + 'static>(
    writer: W,
    codec: Option<&str>,
) -> Result<Box<dyn FinishWrite>> {
    match codec {
        None => Ok(plain_writer(writer)),
        Some(name) => {
            let codec = codec_by_name(name)?;
            codec
                .wrap_writer_dyn(Box::new(writer))
                .with_context(|| format!("wrap writer with {} codec", codec.name()))
        }
    }
}

/// Automatically detect and wrap a reader with decompression if needed.
///
/// Detection strategy:
/// 1. Check file path extension (fast path)
/// 2. Fall back to magic byte detection if extension not recognized
/// 3. Return unwrapped reader if no compression detected
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    if let Some(codec) = detect_from_extension(&path_hint) {
        return codec
            .wrap_reader_dyn(Box::new(reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    let mut buf_reader = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buf_reader) {
        return codec
            .wrap_reader_dyn(Box::new(buf_reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    Ok(Box::new(buf_reader))
}

/// Wrap a writer with compression chosen by the file extension of `path_hint`.
pub fn auto_detect_writer<W: Write + 'static>(
    writer: W,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn FinishWrite>> {
    if let Some(codec) = detect_from_extension(&path_hint) {
        return codec
            .wrap_writer_dyn(Box::new(writer))
            .with_context(|| format!("wrap writer with {} codec", codec.name()));
    }
    Ok(plain_writer(writer))
}

// ============================================================================
// Built-in Codec Implementations
// ============================================================================

#[cfg(feature = "compression-lz4")]
struct Lz4Codec;

#[cfg(feature = "compression-lz4")]
impl CompressionCodec for Lz4Codec {
    fn name(&self) -> &str {
        "lz4"
    }

    fn extensions(&self) -> &[&str] {
        &[".lz4"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x04, 0x22, 0x4d, 0x18])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        Ok(Box::new(lz4_flex::frame::FrameDecoder::new(reader)))
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        Ok(Box::new(lz4_flex::frame::FrameEncoder::new(writer)))
    }
}

#[cfg(feature = "compression-lz4")]
impl FinishWrite for lz4_flex::frame::FrameEncoder<Box<dyn Write>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map_err(io::Error::other)?.flush()
    }
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use flate2::read::MultiGzDecoder;
        Ok(Box::new(MultiGzDecoder::new(reader)))
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(GzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-gzip")]
impl FinishWrite for flate2::write::GzEncoder<Box<dyn Write>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        (*self).finish()?.flush()
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        zstd::stream::write::Encoder::new(writer, 3).map(|e| Box::new(e) as Box<dyn FinishWrite>)
    }
}

#[cfg(feature = "compression-zstd")]
impl FinishWrite for zstd::stream::write::Encoder<'static, Box<dyn Write>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        (*self).finish()?.flush()
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl CompressionCodec for Bzip2Codec {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn extensions(&self) -> &[&str] {
        &[".bz2", ".bzip2"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x42, 0x5a, 0x68])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use bzip2::read::BzDecoder;
        Ok(Box::new(BzDecoder::new(reader)))
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        use bzip2::Compression;
        use bzip2::write::BzEncoder;
        Ok(Box::new(BzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-bzip2")]
impl FinishWrite for bzip2::write::BzEncoder<Box<dyn Write>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        (*self).finish()?.flush()
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl CompressionCodec for XzCodec {
    fn name(&self) -> &str {
        "xz"
    }

    fn extensions(&self) -> &[&str] {
        &[".xz"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use xz2::read::XzDecoder;
        Ok(Box::new(XzDecoder::new(reader)))
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        use xz2::write::XzEncoder;
        Ok(Box::new(XzEncoder::new(writer, 6)))
    }
}

#[cfg(feature = "compression-xz")]
impl FinishWrite for xz2::write::XzEncoder<Box<dyn Write>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        (*self).finish()?.flush()
    }
}
