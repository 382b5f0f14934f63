//! linepipe: stdin/stdout front-end for linepipe-core.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use linepipe_core::stream::{run_stream, ApiConfig, InputSource, OutputSink};

mod args;

use args::Args;

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_filter())).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.pipeline_config()?;

    let input = match &args.input {
        Some(path) => InputSource::File(path.clone()),
        None => InputSource::Reader(Box::new(io::stdin())),
    };
    let output = match &args.output {
        Some(path) => OutputSink::File(path.clone()),
        None => OutputSink::Writer(Box::new(io::stdout())),
    };

    let snapshot = run_stream(input, output, config, ApiConfig::new(false, args.timeout()))
        .context("pipeline failed")?;
    info!(
        "{} lines read, {} records written ({:?})",
        snapshot.counters.lines_read, snapshot.counters.records_emitted, snapshot.reader_exit
    );

    if args.stats {
        let json = serde_json::to_string_pretty(&snapshot).context("encoding stats")?;
        writeln!(io::stderr(), "{json}").context("writing stats")?;
    }
    Ok(())
}
