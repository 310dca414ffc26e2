//! The sampling loop: reads metrics once per interval, turns cumulative OS
//! counters into per-interval deltas and hands each sample to the CSV logger.

use crate::error::{Field, MonitorError, Result};
use crate::logging::CsvLogger;
use crate::metrics::{DiskIo, MetricsProvider, NetIo};
use crate::stop::StopSignal;
use chrono::Utc;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// One emitted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// 1-based, incremented by one per emitted sample
    pub index: u64,
    pub memory_percent: f64,
    pub cpu_percent: f64,
    pub disk_use_percent: f64,
    pub disk_read_bytes: u64,
    pub disk_write_bytes: u64,
    pub net_in_bytes: u64,
    pub net_out_bytes: u64,
    /// Seconds since the Unix epoch at emission
    pub timestamp: i64,
}

/// Per-interval growth of the cumulative counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deltas {
    pub disk_read: u64,
    pub disk_write: u64,
    pub net_in: u64,
    pub net_out: u64,
    /// Number of counters that went backwards and were clamped to zero
    pub regressions: u32,
}

/// Last absolute counter values seen by the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CumulativeCounters {
    pub disk: DiskIo,
    pub net: NetIo,
}

impl CumulativeCounters {
    /// Deltas from the stored values to `current`, then stores `current` as
    /// the baseline for the next call.
    pub fn advance(&mut self, current: CumulativeCounters) -> Deltas {
        let mut regressions = 0;
        let mut delta = |name: &str, prev: u64, curr: u64| match curr.checked_sub(prev) {
            Some(d) => d,
            None => {
                // Counter reset (reboot, driver reload, 32-bit wrap)
                tracing::warn!(counter = name, previous = prev, current = curr, "Counter went backwards, recording 0");
                regressions += 1;
                0
            }
        };

        let disk_read = delta("disk_read", self.disk.read_bytes, current.disk.read_bytes);
        let disk_write = delta("disk_write", self.disk.write_bytes, current.disk.write_bytes);
        let net_in = delta("net_in", self.net.recv_bytes, current.net.recv_bytes);
        let net_out = delta("net_out", self.net.sent_bytes, current.net.sent_bytes);

        *self = current;
        Deltas {
            disk_read,
            disk_write,
            net_in,
            net_out,
            regressions,
        }
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub samples: u64,
    pub regressions: u64,
}

/// Drives collection until the stop signal is observed.
pub struct SampleLoop<P, W> {
    provider: P,
    logger: CsvLogger<W>,
    interval: Duration,
    mountpoint: PathBuf,
}

impl<P, W> SampleLoop<P, W>
where
    P: MetricsProvider,
    W: Write,
{
    pub fn new(provider: P, logger: CsvLogger<W>, interval: Duration, mountpoint: PathBuf) -> Self {
        Self {
            provider,
            logger,
            interval,
            mountpoint,
        }
    }

    /// Runs until `stop` is set or a provider/log error occurs.
    ///
    /// The signal is checked before each collection and again after each
    /// emission; a stop that arrives mid-collection lets that sample finish.
    pub async fn run(mut self, stop: StopSignal) -> Result<RunReport> {
        let mut counters = self.read_counters()?;
        // Baseline for the first real reading; the value itself is meaningless
        self.provider
            .cpu_percent_nonblocking()
            .map_err(|e| MonitorError::provider(Field::Cpu, e))?;

        self.logger.write_header()?;

        let mut report = RunReport::default();
        while !stop.is_set() {
            let sample = self.collect(&mut counters, &mut report)?;
            self.logger.log(&sample)?;
            report.samples = sample.index;

            if stop.is_set() {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        tracing::info!(samples = report.samples, regressions = report.regressions, "Sampling stopped");
        Ok(report)
    }

    /// Reads everything for one tick. Any failure discards the whole tick.
    fn collect(&mut self, counters: &mut CumulativeCounters, report: &mut RunReport) -> Result<Sample> {
        let cpu_percent = self
            .provider
            .cpu_percent_nonblocking()
            .map_err(|e| MonitorError::provider(Field::Cpu, e))?;
        let memory_percent = self
            .provider
            .memory_percent()
            .map_err(|e| MonitorError::provider(Field::Memory, e))?;
        let disk_use_percent = self
            .provider
            .disk_use_percent(&self.mountpoint)
            .map_err(|e| MonitorError::provider(Field::DiskUsage, e))?;

        let current = self.read_counters()?;
        let deltas = counters.advance(current);
        report.regressions += u64::from(deltas.regressions);

        Ok(Sample {
            index: report.samples + 1,
            memory_percent,
            cpu_percent,
            disk_use_percent,
            disk_read_bytes: deltas.disk_read,
            disk_write_bytes: deltas.disk_write,
            net_in_bytes: deltas.net_in,
            net_out_bytes: deltas.net_out,
            timestamp: Utc::now().timestamp(),
        })
    }

    fn read_counters(&mut self) -> Result<CumulativeCounters> {
        let disk = self
            .provider
            .disk_io_counters()
            .map_err(|e| MonitorError::provider(Field::DiskIo, e))?;
        let net = self
            .provider
            .net_io_counters()
            .map_err(|e| MonitorError::provider(Field::NetIo, e))?;
        Ok(CumulativeCounters { disk, net })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(read: u64, write: u64, recv: u64, sent: u64) -> CumulativeCounters {
        CumulativeCounters {
            disk: DiskIo {
                read_bytes: read,
                write_bytes: write,
            },
            net: NetIo {
                recv_bytes: recv,
                sent_bytes: sent,
            },
        }
    }

    #[test]
    fn deltas_are_relative_to_previous_tick() {
        let mut state = counters(100, 200, 300, 400);

        let first = state.advance(counters(150, 260, 300, 410));
        assert_eq!((first.disk_read, first.disk_write, first.net_in, first.net_out), (50, 60, 0, 10));

        let second = state.advance(counters(160, 260, 350, 410));
        assert_eq!((second.disk_read, second.disk_write, second.net_in, second.net_out), (10, 0, 50, 0));
        assert_eq!(state, counters(160, 260, 350, 410));
    }

    #[test]
    fn regression_clamps_to_zero_and_rebases() {
        let mut state = counters(0, 5000, 0, 0);

        let reset = state.advance(counters(0, 100, 0, 0));
        assert_eq!(reset.disk_write, 0);
        assert_eq!(reset.regressions, 1);

        // The next tick measures from the post-reset value
        let after = state.advance(counters(0, 400, 0, 0));
        assert_eq!(after.disk_write, 300);
        assert_eq!(after.regressions, 0);
    }
}
