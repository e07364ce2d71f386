//! Collecting input file paths.
//!
//! Multi-source commands take their file names either from a reader (typically
//! stdin, as in `ls column_* | rowbeam sum`) or from a glob pattern.

use anyhow::{Context, Result};
use glob::glob;
use std::io::Read;
use std::path::PathBuf;

use crate::error::PipelineError;

/// Read file names separated by newlines or spaces. Empty names are skipped.
pub fn read_paths(mut reader: impl Read) -> Result<Vec<PathBuf>> {
    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .context("read file names from input")?;
    let text = String::from_utf8(raw).context("file names must be utf-8")?;
    Ok(text
        .split(['\n', ' '])
        .map(|name| name.trim_end_matches('\r'))
        .filter(|name| !name.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Column files matching `pattern`, in sorted order.
///
/// The sort puts `trip_01 .. trip_12` back in column order, so `--glob 'trip_*'`
/// zips the same columns `ls trip_* |` would. Directories never count as columns.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob(pattern).with_context(|| format!("bad glob '{pattern}'"))?;
    let mut files = entries
        .filter(|entry| entry.as_ref().map_or(true, |path| path.is_file()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("list files for '{pattern}'"))?;
    files.sort_unstable();
    Ok(files)
}

/// Expand a glob pattern; matching nothing is a usage error.
pub fn expand_glob_required(pattern: &str) -> Result<Vec<PathBuf>> {
    let files = expand_glob(pattern)?;
    if files.is_empty() {
        return Err(PipelineError::usage(format!("no files found matching pattern: {pattern}")).into());
    }
    Ok(files)
}
