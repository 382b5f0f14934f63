use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use linepipe_core::stream::{PipelineConfig, ResiduePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Residue {
    /// Emit trailing text as a short final record.
    Flush,
    /// Drop trailing text shorter than one record.
    Discard,
}

impl From<Residue> for ResiduePolicy {
    fn from(r: Residue) -> Self {
        match r {
            Residue::Flush => ResiduePolicy::Flush,
            Residue::Discard => ResiduePolicy::Discard,
        }
    }
}

/// Normalize line terminators, collapse "++" into "^" and re-chunk the
/// input into fixed-width records.
#[derive(Parser, Debug)]
#[command(name = "linepipe", version)]
pub struct Args {
    /// Read lines from this file instead of stdin.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Write records to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON file with pipeline settings; flags below override it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub queue_capacity: Option<usize>,

    #[arg(long)]
    pub max_line_len: Option<usize>,

    /// Stop after forwarding this many lines even without a sentinel.
    #[arg(long)]
    pub max_lines: Option<usize>,

    #[arg(long)]
    pub record_width: Option<usize>,

    /// Line text that ends the stream.
    #[arg(long)]
    pub sentinel: Option<String>,

    #[arg(long)]
    pub marker: Option<char>,

    #[arg(long)]
    pub replacement: Option<char>,

    #[arg(long, value_enum)]
    pub residue: Option<Residue>,

    /// Cancel the run after this many milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Print the telemetry snapshot as JSON on stderr.
    #[arg(long)]
    pub stats: bool,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Config file (if any) with flag overrides applied, validated.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let base = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        let config = self.apply_overrides(base);
        config.validate().context("invalid pipeline settings")?;
        Ok(config)
    }

    pub fn apply_overrides(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(v) = self.queue_capacity {
            config.queue_capacity = v;
        }
        if let Some(v) = self.max_line_len {
            config.max_line_len = v;
        }
        if let Some(v) = self.max_lines {
            config.max_input_lines = v;
        }
        if let Some(v) = self.record_width {
            config.record_width = v;
        }
        if let Some(v) = &self.sentinel {
            config.sentinel = v.clone();
        }
        if let Some(v) = self.marker {
            config.marker = v;
        }
        if let Some(v) = self.replacement {
            config.replacement = v;
        }
        if let Some(v) = self.residue {
            config.residue = v.into();
        }
        config
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
