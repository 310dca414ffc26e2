//! Memory usage from /proc/meminfo.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

/// Used share of physical memory, in percent.
pub fn read_percent(proc_root: &Path) -> Result<f64> {
    let path = proc_root.join("meminfo");
    let meminfo = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    used_percent(&meminfo)
}

/// Counts MemAvailable as free memory; kernels older than 3.14 lack it, so
/// fall back to MemFree + Buffers + Cached there.
pub fn used_percent(meminfo: &str) -> Result<f64> {
    let mut total: Option<u64> = None;
    let mut available: Option<u64> = None;
    let mut free: u64 = 0;
    let mut buffers: u64 = 0;
    let mut cached: u64 = 0;

    for line in meminfo.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let value: u64 = match parts[1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };

        match parts[0] {
            "MemTotal:" => total = Some(value),
            "MemAvailable:" => available = Some(value),
            "MemFree:" => free = value,
            "Buffers:" => buffers = value,
            "Cached:" => cached = value,
            _ => {}
        }
    }

    let total = match total {
        Some(t) if t > 0 => t,
        _ => return Err(anyhow!("MemTotal missing from /proc/meminfo")),
    };
    let available = available.unwrap_or(free + buffers + cached).min(total);

    Ok(100.0 * (total - available) as f64 / total as f64)
}
