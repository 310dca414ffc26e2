//! Command-line surface and the resolved run configuration.

use crate::error::{MonitorError, Result};
use crate::logging::DEFAULT_PRECISION;
use crate::sampler::DEFAULT_INTERVAL;
use crate::stop::StopStrategy;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG_FILE: &str = "TxMonitor.csv";

/// How long a pending stop strategy may take to exit once sampling is over.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

pub const USAGE: &str = "\
Usage:
  txmonitor [OPTIONS] <seconds> [<output_file.csv>]
  txmonitor [OPTIONS] <output_file.csv>    (continuous mode, press ENTER to stop)

File names starting with '-' go after '--', e.g. `txmonitor -- -out.csv`.
";

/// Sample CPU, memory, disk and network usage into a CSV file
#[derive(Parser, Debug)]
#[command(name = "txmonitor")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "File names starting with '-' go after '--', e.g. `txmonitor -- -out.csv`.")]
pub struct Args {
    /// `<seconds> [<output_file.csv>]` for a timed run, or `<output_file.csv>` to run until ENTER
    #[arg(value_name = "ARGS", allow_negative_numbers = true)]
    pub positional: Vec<String>,

    /// Sampling interval in seconds
    #[arg(short = 'i', long, allow_negative_numbers = true, default_value_t = DEFAULT_INTERVAL.as_secs_f64())]
    pub interval: f64,

    /// Decimal places for the percentage columns
    #[arg(long, default_value_t = DEFAULT_PRECISION)]
    pub precision: usize,

    /// Do not echo rows to stdout
    #[arg(short, long)]
    pub quiet: bool,
}

/// Settings for one monitoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub strategy: StopStrategy,
    pub output: PathBuf,
    pub interval: Duration,
    pub precision: usize,
    /// Echo rows to stdout as well as the file
    pub mirror: bool,
    /// Volume whose usage is reported
    pub mountpoint: PathBuf,
    pub shutdown_grace: Duration,
}

impl RunConfig {
    pub fn new(strategy: StopStrategy, output: impl Into<PathBuf>) -> Self {
        Self {
            strategy,
            output: output.into(),
            interval: DEFAULT_INTERVAL,
            precision: DEFAULT_PRECISION,
            mirror: true,
            mountpoint: PathBuf::from("/"),
            shutdown_grace: SHUTDOWN_GRACE,
        }
    }

    pub fn from_args(args: &Args) -> Result<Self> {
        let (strategy, output) = select_mode(&args.positional)?;

        let interval = Duration::try_from_secs_f64(args.interval)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                MonitorError::Config(format!(
                    "sampling interval must be a positive number of seconds, got {}",
                    args.interval
                ))
            })?;

        Ok(Self {
            interval,
            precision: args.precision,
            mirror: !args.quiet,
            ..Self::new(strategy, output)
        })
    }

    pub fn mode_label(&self) -> String {
        match self.strategy {
            StopStrategy::Timed(d) => format!("timed, {}s", d.as_secs()),
            StopStrategy::Manual => "continuous".to_string(),
        }
    }
}

/// A first argument made only of ASCII digits selects a timed run; anything
/// else, `-5` included, is the output file of a manual run.
pub fn select_mode(positional: &[String]) -> Result<(StopStrategy, PathBuf)> {
    let first = positional.first().ok_or(MonitorError::MissingArguments)?;

    let (strategy, output, consumed) = if !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit()) {
        let secs: u64 = first
            .parse()
            .map_err(|_| MonitorError::Config(format!("duration '{first}' is out of range")))?;
        if secs == 0 {
            return Err(MonitorError::Config("duration must be at least 1 second".into()));
        }
        let output = positional
            .get(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
        (StopStrategy::Timed(Duration::from_secs(secs)), output, 2)
    } else {
        (StopStrategy::Manual, PathBuf::from(first), 1)
    };

    if positional.len() > consumed {
        tracing::warn!(ignored = ?&positional[consumed..], "Ignoring extra arguments");
    }

    Ok((strategy, output))
}
