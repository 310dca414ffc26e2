//! Runs one monitoring session: the stop strategy and the sample loop side
//! by side, then tears the strategy down.

use crate::config::RunConfig;
use crate::error::Result;
use crate::logging::CsvLogger;
use crate::metrics::MetricsProvider;
use crate::sampler::{RunReport, SampleLoop};
use crate::stop::{StopController, StopSignal};
use std::io::{BufRead, Write};

/// Samples into `logger` until the configured strategy stops the run.
///
/// `input` is only read in manual mode. Rows written before a failure stay
/// in the log; the strategy is shut down whether or not sampling succeeded.
pub async fn run<P, W, R>(config: &RunConfig, provider: P, logger: CsvLogger<W>, input: R) -> Result<RunReport>
where
    P: MetricsProvider,
    W: Write,
    R: BufRead + Send + 'static,
{
    tracing::info!(
        mode = %config.mode_label(),
        output = %config.output.display(),
        interval_ms = config.interval.as_millis() as u64,
        "Starting monitor"
    );

    let signal = StopSignal::new();
    let controller = StopController::spawn(config.strategy, signal.clone(), input)?;

    let sampler = SampleLoop::new(provider, logger, config.interval, config.mountpoint.clone());
    let result = sampler.run(signal.clone()).await;

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Sampling failed");
    }

    let outcome = controller.shutdown(&signal, config.shutdown_grace).await;
    tracing::debug!(?outcome, "Stop strategy finished");

    result
}
