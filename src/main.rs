//! txmonitor - sample CPU, memory, disk and network usage into a CSV file.
//!
//! Runs for a fixed number of seconds, or until ENTER is pressed.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufReader};
use tracing_subscriber::EnvFilter;
use txmonitor::config::USAGE;
use txmonitor::{monitor, Args, CsvLogger, MonitorError, ProcMetrics, RunConfig, StopStrategy};

fn init_tracing() -> Result<()> {
    // stdout carries the CSV mirror, so diagnostics go to stderr
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("txmonitor=warn"))
        .context("Invalid RUST_LOG filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let config = match RunConfig::from_args(&args) {
        Ok(config) => config,
        Err(MonitorError::MissingArguments) => {
            print!("{USAGE}");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Invalid arguments"),
    };

    let logger = CsvLogger::open(&config.output, config.precision, config.mirror)
        .context("Failed to open output file")?;

    println!("Monitoring ({})...", config.mode_label());
    if config.strategy == StopStrategy::Manual {
        println!("Press ENTER to stop...");
    }

    let report = monitor::run(&config, ProcMetrics::new(), logger, BufReader::new(io::stdin()))
        .await
        .with_context(|| format!("Monitoring aborted; rows so far are in {}", config.output.display()))?;

    if report.regressions > 0 {
        eprintln!(
            "Note: {} counter reset(s) were recorded as zero deltas",
            report.regressions
        );
    }
    println!(
        "\nMonitoring finished: {} samples saved to {}.",
        report.samples,
        config.output.display()
    );

    Ok(())
}
