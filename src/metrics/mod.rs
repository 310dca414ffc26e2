//! Metrics collection for the sampler.
//!
//! The sampler only sees the [`MetricsProvider`] trait; [`ProcMetrics`] is the
//! Linux implementation backed by procfs and statvfs.

pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Absolute disk counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskIo {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Absolute network counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetIo {
    pub recv_bytes: u64,
    pub sent_bytes: u64,
}

/// Source of the readings the sampler records.
///
/// Every call is synchronous and may fail; the sampler never retries a
/// failed call within the same tick.
pub trait MetricsProvider: Send {
    /// CPU utilization over the window since the previous call.
    fn cpu_percent_nonblocking(&mut self) -> Result<f64>;

    fn memory_percent(&mut self) -> Result<f64>;

    /// Usage of the volume mounted at `mountpoint`.
    fn disk_use_percent(&mut self, mountpoint: &Path) -> Result<f64>;

    fn disk_io_counters(&mut self) -> Result<DiskIo>;

    fn net_io_counters(&mut self) -> Result<NetIo>;
}

/// Reads system-wide metrics from /proc and /sys.
pub struct ProcMetrics {
    proc_root: PathBuf,
    sys_block: PathBuf,
    cpu: cpu::CpuCollector,
}

impl ProcMetrics {
    pub fn new() -> Self {
        Self::with_roots("/proc", "/sys/block")
    }

    /// Alternate roots, for containers that mount the host's procfs elsewhere.
    pub fn with_roots(proc_root: impl Into<PathBuf>, sys_block: impl Into<PathBuf>) -> Self {
        let proc_root = proc_root.into();
        Self {
            cpu: cpu::CpuCollector::new(&proc_root),
            proc_root,
            sys_block: sys_block.into(),
        }
    }
}

impl Default for ProcMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for ProcMetrics {
    fn cpu_percent_nonblocking(&mut self) -> Result<f64> {
        self.cpu.percent()
    }

    fn memory_percent(&mut self) -> Result<f64> {
        memory::read_percent(&self.proc_root)
    }

    fn disk_use_percent(&mut self, mountpoint: &Path) -> Result<f64> {
        disk::use_percent(mountpoint)
    }

    fn disk_io_counters(&mut self) -> Result<DiskIo> {
        disk::read_io_counters(&self.proc_root, &self.sys_block)
    }

    fn net_io_counters(&mut self) -> Result<NetIo> {
        network::read_io_counters(&self.proc_root)
    }
}
