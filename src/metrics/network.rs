//! Network byte counters from /proc/net/dev.

use super::NetIo;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn read_io_counters(proc_root: &Path) -> Result<NetIo> {
    let path = proc_root.join("net").join("dev");
    let netdev = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_net_dev(&netdev)
}

/// Totals received and sent bytes over every interface, loopback included.
pub fn parse_net_dev(netdev: &str) -> Result<NetIo> {
    let mut totals = NetIo::default();

    // Two header lines precede the interfaces
    for line in netdev.lines().skip(2) {
        // Large counters can run into the colon ("eth0:123456"), so split on it
        let Some((interface, counters)) = line.split_once(':') else {
            continue;
        };
        let interface = interface.trim();

        let fields: Vec<&str> = counters.split_whitespace().collect();
        if fields.len() < 16 {
            continue;
        }

        let rx_bytes: u64 = fields[0]
            .parse()
            .with_context(|| format!("Malformed rx bytes for {interface}"))?;
        let tx_bytes: u64 = fields[8]
            .parse()
            .with_context(|| format!("Malformed tx bytes for {interface}"))?;

        totals.recv_bytes = totals.recv_bytes.wrapping_add(rx_bytes);
        totals.sent_bytes = totals.sent_bytes.wrapping_add(tx_bytes);
    }

    Ok(totals)
}
