//! Running a validated [`Plan`].

use anyhow::{Context, Result};
use tracing::debug;

use rowbeam::aggregate::SumAggregator;
use rowbeam::io::RowRead;
use rowbeam::io::output::RowOutput;
use rowbeam::io::writer::{RowWriter, Sink};
use rowbeam::io::{Format, InputSpec};
use rowbeam::merge::ZipMerge;
use rowbeam::metrics::RunStats;
use rowbeam::row::ColumnCount;
use rowbeam::transforms;

use crate::cli::{Plan, Runtime, ZipConfig};

/// Standard output plus the optional tee file.
fn open_writer(rt: &Runtime) -> Result<RowWriter> {
    let mut sinks = vec![Sink::stdout(rt.output_codec.as_deref())?];
    if let Some(path) = &rt.tee {
        sinks.push(Sink::create(path, None).with_context(|| format!("open tee {}", path.display()))?);
    }
    debug!(sinks = sinks.len(), "opened output");
    Ok(RowWriter::new(sinks))
}

fn open_output(rt: &Runtime, format: Format) -> Result<RowOutput> {
    Ok(RowOutput::new(open_writer(rt)?, format, rt.delimiter))
}

fn source_count(input: &InputSpec) -> usize {
    input.paths.len().max(1)
}

fn open_zip(cfg: &ZipConfig, stats: &mut RunStats) -> Result<ZipMerge> {
    stats.sources = cfg.selection.len();
    ZipMerge::open(&cfg.paths, &cfg.selection, cfg.codec.as_deref())
}

/// Finish `out` once the transform succeeded; drop its buffered rows otherwise.
fn settle<T>(out: RowOutput, result: Result<T>, stats: &mut RunStats) -> Result<()> {
    if let Err(err) = result {
        out.discard();
        return Err(err);
    }
    let (rows, bytes) = out.finish()?;
    stats.rows_written = rows;
    stats.bytes_written = bytes;
    Ok(())
}

/// Run `plan` to completion, flushing all output.
pub fn execute(plan: Plan, rt: &Runtime, command: &str) -> Result<RunStats> {
    let mut stats = RunStats::start(command);
    match plan {
        Plan::Count(cfg) => {
            stats.sources = source_count(&cfg.input);
            let mut input = cfg.input.open(ColumnCount::AtLeast(1))?;
            let count = transforms::count(input.as_mut(), cfg.byte)?;
            stats.rows_read = input.rows_read();

            let mut writer = open_writer(rt)?;
            writer.write_bytes(format!("{count}\n").as_bytes())?;
            stats.rows_written = 1;
            stats.bytes_written = writer.finish()?;
        }
        Plan::Select(cfg) => {
            stats.sources = source_count(&cfg.input);
            let mut input = cfg.input.open(cfg.selection.required_columns())?;
            let mut out = open_output(rt, cfg.output)?;
            let result = transforms::select(input.as_mut(), &cfg.selection, &mut out);
            stats.rows_read = input.rows_read();
            settle(out, result, &mut stats)?;
        }
        Plan::Reverse(cfg) => {
            stats.sources = source_count(&cfg.input);
            let mut input = cfg.input.open(ColumnCount::AtLeast(1))?;
            let mut out = open_output(rt, cfg.output)?;
            let result = transforms::reverse(input.as_mut(), &mut out);
            stats.rows_read = input.rows_read();
            settle(out, result, &mut stats)?;
        }
        Plan::Convert(cfg) => {
            stats.sources = source_count(&cfg.input);
            let mut input = cfg.input.open(ColumnCount::AtLeast(1))?;
            let mut out = open_output(rt, cfg.output)?;
            let result = transforms::convert(input.as_mut(), &mut out);
            stats.rows_read = input.rows_read();
            settle(out, result, &mut stats)?;
        }
        Plan::Zip(cfg) => {
            let mut merge = open_zip(&cfg, &mut stats)?;
            let mut out = open_output(rt, cfg.output)?;
            let result = transforms::zip(&mut merge, &mut out);
            stats.rows_read = merge.rows_read();
            settle(out, result, &mut stats)?;
        }
        Plan::Sum(cfg) => {
            let mut merge = open_zip(&cfg.zip, &mut stats)?;
            let agg = match cfg.key_width {
                Some(width) => SumAggregator::new().with_key_width(width),
                None => SumAggregator::new(),
            };
            let mut out = open_output(rt, cfg.zip.output)?;
            let result = transforms::zip_sum(&mut merge, agg, &mut out);
            stats.rows_read = merge.rows_read();
            settle(out, result, &mut stats)?;
        }
        Plan::Unzip(cfg) => {
            stats.sources = source_count(&cfg.input);
            let mut input = cfg.input.open(ColumnCount::AtLeast(1))?;
            let paths = transforms::unzip(
                input.as_mut(),
                &cfg.prefix,
                cfg.selection.as_ref(),
                cfg.codec.as_deref(),
            )?;
            stats.rows_read = input.rows_read();

            let mut writer = open_writer(rt)?;
            for path in &paths {
                writer.write_bytes(format!("{}\n", path.display()).as_bytes())?;
            }
            stats.rows_written = paths.len() as u64;
            stats.bytes_written = writer.finish()?;
        }
    }
    Ok(stats.finish())
}
