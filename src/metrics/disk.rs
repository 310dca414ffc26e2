//! Disk I/O counters from /proc/diskstats and volume usage via statvfs.

use super::DiskIo;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// /proc/diskstats always counts in 512-byte sectors regardless of the device.
const SECTOR_SIZE: u64 = 512;

/// Sum of bytes read and written by every whole disk since boot.
pub fn read_io_counters(proc_root: &Path, sys_block: &Path) -> Result<DiskIo> {
    let path = proc_root.join("diskstats");
    let diskstats = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let sys_block = sys_block.is_dir().then_some(sys_block);
    parse_diskstats(&diskstats, |device| is_whole_disk(device, sys_block))
}

/// Totals the devices accepted by `include`, so partitions are not counted
/// twice alongside their parent disk.
pub fn parse_diskstats(diskstats: &str, include: impl Fn(&str) -> bool) -> Result<DiskIo> {
    let mut totals = DiskIo::default();

    for line in diskstats.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }

        let device = parts[2];
        if !include(device) {
            continue;
        }

        let sectors_read: u64 = parts[5]
            .parse()
            .with_context(|| format!("Malformed sectors read for {device}"))?;
        let sectors_written: u64 = parts[9]
            .parse()
            .with_context(|| format!("Malformed sectors written for {device}"))?;

        totals.read_bytes = totals
            .read_bytes
            .wrapping_add(sectors_read.wrapping_mul(SECTOR_SIZE));
        totals.write_bytes = totals
            .write_bytes
            .wrapping_add(sectors_written.wrapping_mul(SECTOR_SIZE));
    }

    Ok(totals)
}

/// Whole disks appear under /sys/block; partitions do not. Without sysfs,
/// fall back to guessing from the device name.
fn is_whole_disk(device: &str, sys_block: Option<&Path>) -> bool {
    if device.starts_with("loop") || device.starts_with("ram") || device.starts_with("dm-") {
        return false;
    }

    match sys_block {
        Some(dir) => dir.join(device.replace('/', "!")).exists(),
        None => !looks_like_partition(device),
    }
}

fn looks_like_partition(device: &str) -> bool {
    let ends_in_digit = device
        .chars()
        .last()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false);

    if device.starts_with("nvme") || device.starts_with("mmcblk") {
        // nvme0n1p2, mmcblk0p1
        ends_in_digit && device.rsplit_once('p').is_some_and(|(head, tail)| {
            head.ends_with(|c: char| c.is_ascii_digit())
                && !tail.is_empty()
                && tail.chars().all(|c| c.is_ascii_digit())
        })
    } else {
        ends_in_digit
    }
}

/// Used share of the filesystem holding `mountpoint`, excluding blocks
/// reserved for root (same definition as `df`).
#[cfg(unix)]
pub fn use_percent(mountpoint: &Path) -> Result<f64> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(mountpoint.as_os_str().as_bytes())
        .with_context(|| format!("Invalid mount point {}", mountpoint.display()))?;
    let mut statvfs = MaybeUninit::<libc::statvfs>::uninit();

    let result = unsafe { libc::statvfs(c_path.as_ptr(), statvfs.as_mut_ptr()) };
    if result != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("statvfs failed for {}", mountpoint.display()));
    }
    let statvfs = unsafe { statvfs.assume_init() };

    let block_size = statvfs.f_frsize as u64;
    let used = (statvfs.f_blocks as u64).saturating_sub(statvfs.f_bfree as u64) * block_size;
    let available = statvfs.f_bavail as u64 * block_size;

    Ok(usage_percent(used, available))
}

#[cfg(not(unix))]
pub fn use_percent(mountpoint: &Path) -> Result<f64> {
    Err(anyhow::anyhow!(
        "disk usage is not supported on this platform ({})",
        mountpoint.display()
    ))
}

pub fn usage_percent(used: u64, available: u64) -> f64 {
    let visible = used + available;
    if visible == 0 {
        return 0.0;
    }
    100.0 * used as f64 / visible as f64
}
