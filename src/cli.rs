//! Command-line arguments and their validated configurations.
//!
//! Parsing happens in two steps: clap turns argv into the `*Args` structs, then
//! [`Command::plan`] checks them and produces a [`Plan`] of plain config structs.
//! Every usage error surfaces in the second step, before any row is read.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;

use rowbeam::error::PipelineError;
use rowbeam::io::compression::codec_by_name;
use rowbeam::io::paths::{expand_glob_required, read_paths};
use rowbeam::io::{Format, InputSpec};
use rowbeam::merge::Selection;
use rowbeam::row::ColumnCount;

/// Streaming row transforms over delimited text and BSV
#[derive(Parser, Debug)]
#[command(name = "rowbeam")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub globals: GlobalArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Decompress inputs with this codec (lz4, gzip, zstd, bzip2, xz)
    #[arg(long, global = true)]
    pub codec: Option<String>,

    /// Shorthand for --codec lz4
    #[arg(short = 'l', long = "lz4", global = true)]
    pub lz4: bool,

    /// Compress standard output with this codec
    #[arg(long = "output-codec", global = true)]
    pub output_codec: Option<String>,

    /// Also write output to this file
    #[arg(long, global = true)]
    pub tee: Option<PathBuf>,

    /// Field delimiter for text input and output
    #[arg(long, global = true, default_value_t = ',')]
    pub delimiter: char,

    /// Print run statistics as JSON to stderr
    #[arg(long, global = true)]
    pub stats: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Count rows whose first column starts with a given byte
    Count(CountArgs),
    /// Write the chosen columns in the chosen order
    Select(SelectArgs),
    /// Write every row with its columns reversed
    Reverse(RowsArgs),
    /// Zip single-column BSV files, named on stdin, into rows
    Zip(ZipArgs),
    /// Zip, then sum column 2 (8-byte float) per distinct column 1
    Sum(SumArgs),
    /// Convert delimited text to BSV
    ToBsv(ConvertArgs),
    /// Convert BSV to delimited text
    ToCsv(ConvertArgs),
    /// Split rows into one single-column BSV file per column
    Unzip(UnzipArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Input files, read back to back (standard input when none)
    pub files: Vec<PathBuf>,

    /// Input format
    #[arg(long = "input", value_enum, default_value_t = Format::Csv)]
    pub format: Format,

    /// Exact column count; required for bsv input
    #[arg(long)]
    pub columns: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct CountArgs {
    /// Byte the first column must start with
    #[arg(long = "starts-with", default_value_t = 'f')]
    pub starts_with: char,

    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SelectArgs {
    /// 1-based columns in output order, like 3,1
    pub selection: String,

    #[command(flatten)]
    pub input: InputArgs,

    /// Output format
    #[arg(long, value_enum)]
    pub output: Option<Format>,
}

#[derive(Args, Debug, Clone)]
pub struct RowsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output format
    #[arg(long, value_enum)]
    pub output: Option<Format>,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Input files, read back to back (standard input when none)
    pub files: Vec<PathBuf>,

    /// Exact column count; required when reading bsv
    #[arg(long)]
    pub columns: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// 1-based sources in output order, like 2,1 (default: all)
    pub selection: Option<String>,

    /// Take source files from a glob instead of stdin
    #[arg(long)]
    pub glob: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ZipArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Output format
    #[arg(long, value_enum)]
    pub output: Option<Format>,
}

#[derive(Args, Debug, Clone)]
pub struct SumArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Truncate keys to their first N bytes
    #[arg(long = "key-width")]
    pub key_width: Option<usize>,

    /// Output format
    #[arg(long, value_enum)]
    pub output: Option<Format>,
}

#[derive(Args, Debug, Clone)]
pub struct UnzipArgs {
    /// Output files are named <PREFIX>_<column>
    pub prefix: String,

    /// Only split out these 1-based columns
    #[arg(long = "select")]
    pub selection: Option<String>,

    #[command(flatten)]
    pub input: InputArgs,
}

/// Validated global settings.
#[derive(Debug, Clone)]
pub struct Runtime {
    pub codec: Option<String>,
    pub output_codec: Option<String>,
    pub tee: Option<PathBuf>,
    pub delimiter: u8,
    pub stats: bool,
}

#[derive(Debug, Clone)]
pub struct CountConfig {
    pub input: InputSpec,
    pub byte: u8,
}

#[derive(Debug, Clone)]
pub struct SelectConfig {
    pub input: InputSpec,
    pub selection: Selection,
    pub output: Format,
}

/// Reverse and the format conversions: rows in, rows out.
#[derive(Debug, Clone)]
pub struct RowsConfig {
    pub input: InputSpec,
    pub output: Format,
}

#[derive(Debug, Clone)]
pub struct ZipConfig {
    pub paths: Vec<PathBuf>,
    pub selection: Selection,
    pub codec: Option<String>,
    pub output: Format,
}

#[derive(Debug, Clone)]
pub struct SumConfig {
    pub zip: ZipConfig,
    pub key_width: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct UnzipConfig {
    pub input: InputSpec,
    pub prefix: String,
    pub selection: Option<Selection>,
    pub codec: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Plan {
    Count(CountConfig),
    Select(SelectConfig),
    Reverse(RowsConfig),
    Convert(RowsConfig),
    Zip(ZipConfig),
    Sum(SumConfig),
    Unzip(UnzipConfig),
}

impl GlobalArgs {
    pub fn runtime(&self) -> Result<Runtime> {
        let codec = match (&self.codec, self.lz4) {
            (Some(name), true) if !name.eq_ignore_ascii_case("lz4") => {
                return Err(PipelineError::usage(format!(
                    "--lz4 conflicts with --codec {name}"
                ))
                .into());
            }
            (None, true) => Some("lz4".to_string()),
            (codec, _) => codec.clone(),
        };
        for name in codec.iter().chain(self.output_codec.iter()) {
            codec_by_name(name)?;
        }
        Ok(Runtime {
            codec,
            output_codec: self.output_codec.clone(),
            tee: self.tee.clone(),
            delimiter: ascii_byte(self.delimiter, "--delimiter")?,
            stats: self.stats,
        })
    }
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Count(_) => "count",
            Command::Select(_) => "select",
            Command::Reverse(_) => "reverse",
            Command::Zip(_) => "zip",
            Command::Sum(_) => "sum",
            Command::ToBsv(_) => "to-bsv",
            Command::ToCsv(_) => "to-csv",
            Command::Unzip(_) => "unzip",
        }
    }

    /// Validate the arguments into a [`Plan`].
    ///
    /// `zip` and `sum` read their source names here (from stdin or a glob) so a
    /// bad source selection is reported before any source is opened.
    pub fn plan(&self, rt: &Runtime) -> Result<Plan> {
        let plan = match self {
            Command::Count(args) => Plan::Count(CountConfig {
                input: input_spec(&args.input, rt)?,
                byte: ascii_byte(args.starts_with, "--starts-with")?,
            }),
            Command::Select(args) => Plan::Select(SelectConfig {
                input: input_spec(&args.input, rt)?,
                selection: Selection::parse(&args.selection)?,
                output: args.output.unwrap_or(Format::Csv),
            }),
            Command::Reverse(args) => Plan::Reverse(RowsConfig {
                input: input_spec(&args.input, rt)?,
                output: args.output.unwrap_or(Format::Csv),
            }),
            Command::ToBsv(args) => Plan::Convert(RowsConfig {
                input: convert_spec(args, Format::Csv, rt)?,
                output: Format::Bsv,
            }),
            Command::ToCsv(args) => Plan::Convert(RowsConfig {
                input: convert_spec(args, Format::Bsv, rt)?,
                output: Format::Csv,
            }),
            Command::Zip(args) => {
                Plan::Zip(zip_config(&args.sources, args.output.unwrap_or(Format::Bsv), rt)?)
            }
            Command::Sum(args) => {
                if args.key_width == Some(0) {
                    return Err(PipelineError::usage("--key-width must be at least 1").into());
                }
                Plan::Sum(SumConfig {
                    zip: zip_config(&args.sources, args.output.unwrap_or(Format::Bsv), rt)?,
                    key_width: args.key_width,
                })
            }
            Command::Unzip(args) => Plan::Unzip(UnzipConfig {
                input: input_spec(&args.input, rt)?,
                prefix: args.prefix.clone(),
                selection: args.selection.as_deref().map(Selection::parse).transpose()?,
                codec: rt.output_codec.clone(),
            }),
        };
        Ok(plan)
    }
}

fn ascii_byte(c: char, flag: &str) -> Result<u8, PipelineError> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| PipelineError::usage(format!("{flag} must be a single ascii character, got '{c}'")))
}

fn column_count(columns: Option<usize>) -> Result<Option<ColumnCount>, PipelineError> {
    match columns {
        Some(0) => Err(PipelineError::usage("--columns must be at least 1")),
        Some(n) => Ok(Some(ColumnCount::Exact(n))),
        None => Ok(None),
    }
}

fn input_spec(args: &InputArgs, rt: &Runtime) -> Result<InputSpec> {
    if args.format == Format::Bsv && args.columns.is_none() {
        return Err(PipelineError::usage("bsv input needs --columns N").into());
    }
    Ok(InputSpec {
        paths: args.files.clone(),
        format: args.format,
        columns: column_count(args.columns)?,
        delimiter: rt.delimiter,
        codec: rt.codec.clone(),
    })
}

fn convert_spec(args: &ConvertArgs, format: Format, rt: &Runtime) -> Result<InputSpec> {
    input_spec(
        &InputArgs {
            files: args.files.clone(),
            format,
            columns: args.columns,
        },
        rt,
    )
}

fn zip_config(args: &SourceArgs, output: Format, rt: &Runtime) -> Result<ZipConfig> {
    let paths = match &args.glob {
        Some(pattern) => expand_glob_required(pattern)?,
        None => read_paths(io::stdin().lock())?,
    };
    if paths.is_empty() {
        return Err(PipelineError::usage("no source files given on stdin").into());
    }
    let selection = Selection::parse_or_all(args.selection.as_deref(), paths.len())?;
    Ok(ZipConfig {
        paths,
        selection,
        codec: rt.codec.clone(),
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowbeam::error::ErrorKind;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rowbeam").chain(args.iter().copied())).unwrap()
    }

    fn usage_kind(err: anyhow::Error) -> Option<ErrorKind> {
        rowbeam::error::kind_of(&err)
    }

    #[test]
    fn globals_apply_after_the_subcommand() {
        let cli = parse(&["select", "2,1", "-l", "--delimiter", "|", "in.csv"]);
        let rt = cli.globals.runtime().unwrap();
        assert_eq!(rt.codec.as_deref(), Some("lz4"));
        assert_eq!(rt.delimiter, b'|');
        let Plan::Select(cfg) = cli.command.plan(&rt).unwrap() else {
            panic!("expected select plan");
        };
        assert_eq!(cfg.selection.indices(), &[1, 0]);
        assert_eq!(cfg.output, Format::Csv);
        assert_eq!(cfg.input.paths, vec![PathBuf::from("in.csv")]);
    }

    #[test]
    fn bad_arguments_are_usage_errors() {
        let rt = parse(&["count"]).globals.runtime().unwrap();

        let cli = parse(&["select", "1,1"]);
        assert_eq!(usage_kind(cli.command.plan(&rt).unwrap_err()), Some(ErrorKind::Usage));

        let cli = parse(&["to-csv"]);
        assert_eq!(usage_kind(cli.command.plan(&rt).unwrap_err()), Some(ErrorKind::Usage));

        let cli = parse(&["count", "--starts-with", "é"]);
        assert_eq!(usage_kind(cli.command.plan(&rt).unwrap_err()), Some(ErrorKind::Usage));

        let cli = parse(&["--codec", "brotli", "count"]);
        assert_eq!(usage_kind(cli.globals.runtime().unwrap_err()), Some(ErrorKind::Usage));

        let cli = parse(&["--codec", "gzip", "-l", "count"]);
        assert_eq!(usage_kind(cli.globals.runtime().unwrap_err()), Some(ErrorKind::Usage));
    }
}
