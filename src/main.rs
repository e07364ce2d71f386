//! rowbeam - streaming row transforms over delimited text and BSV.
//!
//! Data goes to stdout; logs and `--stats` go to stderr.

use anyhow::Result;
use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

mod cli;
mod commands;

use cli::Cli;
use rowbeam::error::{kind_of, to_exit_code};

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .finish();

    // a subscriber can only be installed once per process
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: Cli) -> Result<()> {
    let rt = cli.globals.runtime()?;
    let plan = cli.command.plan(&rt)?;
    let stats = commands::execute(plan, &rt, cli.command.name())?;
    if rt.stats {
        stats.print();
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.globals.verbose, cli.globals.quiet);

    if let Err(err) = run(cli) {
        error!("{err:#}");
        std::process::exit(to_exit_code(kind_of(&err)));
    }
}
