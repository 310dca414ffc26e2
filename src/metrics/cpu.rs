//! System-wide CPU utilization from /proc/stat.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Raw CPU time values from the aggregate `cpu` line of /proc/stat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    /// Guest time is already folded into user/nice by the kernel, so it is left out.
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    pub fn idle_all(&self) -> u64 {
        self.idle + self.iowait
    }
}

/// Non-blocking CPU percentage: each call reports utilization over the
/// window since the previous call.
pub struct CpuCollector {
    stat_path: PathBuf,
    prev: Option<CpuTimes>,
}

impl CpuCollector {
    pub fn new(proc_root: &Path) -> Self {
        Self {
            stat_path: proc_root.join("stat"),
            prev: None,
        }
    }

    /// Returns 0.0 on the first call, which only establishes the baseline.
    pub fn percent(&mut self) -> Result<f64> {
        let content = fs::read_to_string(&self.stat_path)
            .with_context(|| format!("Failed to read {}", self.stat_path.display()))?;
        let times = parse_aggregate_line(&content)?;

        let percent = match self.prev {
            Some(ref prev) => utilization(prev, &times),
            None => 0.0,
        };
        self.prev = Some(times);

        Ok(percent)
    }
}

pub fn parse_aggregate_line(stat: &str) -> Result<CpuTimes> {
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| anyhow!("no aggregate cpu line in /proc/stat"))?;

    let parts: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|s| s.parse::<u64>())
        .collect::<Result<_, _>>()
        .context("Malformed cpu line in /proc/stat")?;

    if parts.len() < 4 {
        return Err(anyhow!("cpu line in /proc/stat has {} fields", parts.len()));
    }

    Ok(CpuTimes {
        user: parts[0],
        nice: parts[1],
        system: parts[2],
        idle: parts[3],
        iowait: *parts.get(4).unwrap_or(&0),
        irq: *parts.get(5).unwrap_or(&0),
        softirq: *parts.get(6).unwrap_or(&0),
        steal: *parts.get(7).unwrap_or(&0),
    })
}

/// Busy share of the elapsed jiffies between two readings, in percent.
pub fn utilization(prev: &CpuTimes, curr: &CpuTimes) -> f64 {
    let total_delta = curr.total().saturating_sub(prev.total());
    if total_delta == 0 {
        return 0.0;
    }
    let idle_delta = curr.idle_all().saturating_sub(prev.idle_all());
    let busy = total_delta.saturating_sub(idle_delta);

    (100.0 * busy as f64 / total_delta as f64).clamp(0.0, 100.0)
}
