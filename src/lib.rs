//! txmonitor - a local resource sampler.
//!
//! Periodically records system-wide CPU, memory, disk usage and disk/network
//! throughput as CSV rows, until a fixed duration elapses or the operator
//! presses ENTER.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod sampler;
pub mod stop;

pub use config::{Args, RunConfig};
pub use error::{MonitorError, Result};
pub use logging::CsvLogger;
pub use metrics::{DiskIo, MetricsProvider, NetIo, ProcMetrics};
pub use sampler::{RunReport, Sample};
pub use stop::{StopSignal, StopStrategy};
