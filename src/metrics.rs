//! Run statistics.
//!
//! A [`RunStats`] is filled in by the command runner and, when `--stats` is given,
//! printed to stderr as one line of JSON at the end of a successful run.
//!
//! # Example
//!
//! ```
//! use rowbeam::metrics::RunStats;
//!
//! let mut stats = RunStats::start("count");
//! stats.rows_read = 10;
//! let stats = stats.finish();
//! assert_eq!(stats.command, "count");
//! assert!(stats.to_json().contains("\"rows_read\":10"));
//! ```

use serde::Serialize;
use std::io::Write;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub command: String,
    pub sources: usize,
    pub rows_read: u64,
    pub rows_written: u64,
    pub bytes_written: u64,
    pub elapsed_ms: u128,
    #[serde(skip)]
    started: Option<Instant>,
}

impl RunStats {
    /// Start timing a run of `command`.
    #[must_use]
    pub fn start(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            sources: 0,
            rows_read: 0,
            rows_written: 0,
            bytes_written: 0,
            elapsed_ms: 0,
            started: Some(Instant::now()),
        }
    }

    /// Stop the clock.
    #[must_use]
    pub fn finish(mut self) -> Self {
        if let Some(started) = self.started.take() {
            self.elapsed_ms = started.elapsed().as_millis();
        }
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Print as one JSON line to stderr.
    pub fn print(&self) {
        let _ = writeln!(std::io::stderr(), "{}", self.to_json());
    }
}
