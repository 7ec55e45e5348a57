//! Turns raw, cumulative stats samples into point-in-time and rate metrics.
//!
//! CPU and network counters are cumulative for the lifetime of one container
//! identity, so their rates need the previous sample. Every function here
//! overwrites the baseline it owns with the current sample once the current
//! counters are readable, whether or not a rate could be computed this round.
//! Memory values are instantaneous and need no history.

use crate::raw_stats::{RawCpuStats, RawMemoryStats, RawNetworkStats};
use chrono::{DateTime, Utc};
use docker_monitor_shared::{CpuStats, MemoryStats, NetworkStats};
use std::collections::HashMap;

/// Rounding applied to every derived value.
pub const ROUND_PRECISION: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSample {
    pub total_usage: u64,
    pub system_usage: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSample {
    pub read: DateTime<Utc>,
    pub total_tx: u64,
    pub total_rx: u64,
}

/// Counter baselines retained between polls of one container identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviousSample {
    pub cpu: Option<CpuSample>,
    pub network: Option<NetworkSample>,
}

impl PreviousSample {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.network.is_none()
    }
}

pub fn round(value: f64) -> f64 {
    let factor = 10f64.powi(ROUND_PRECISION);
    (value * factor).round() / factor
}

pub fn derive_cpu(raw: Option<&RawCpuStats>, previous: &mut Option<CpuSample>) -> CpuStats {
    let Some(raw) = raw else {
        return CpuStats::default();
    };

    // Older API versions have no online_cpus field
    let online_cpus = raw.online_cpus.or_else(|| {
        raw.cpu_usage
            .as_ref()
            .and_then(|usage| usage.percpu_usage.as_ref())
            .map(|per_cpu| per_cpu.len() as u64)
    });

    let total_usage = raw.cpu_usage.as_ref().and_then(|usage| usage.total_usage);
    let (Some(total_usage), Some(system_usage)) = (total_usage, raw.system_cpu_usage) else {
        log::debug!("Cannot grab CPU usage, counters missing");
        return CpuStats {
            percentage: None,
            online_cpus,
        };
    };

    let current = CpuSample {
        total_usage,
        system_usage,
    };
    let percentage = previous.map(|prev| cpu_percentage(prev, current, online_cpus.unwrap_or(1)));
    *previous = Some(current);

    CpuStats {
        percentage,
        online_cpus,
    }
}

fn cpu_percentage(previous: CpuSample, current: CpuSample, online_cpus: u64) -> f64 {
    let cpu_delta = current.total_usage.checked_sub(previous.total_usage);
    let system_delta = current.system_usage.checked_sub(previous.system_usage);

    match (cpu_delta, system_delta) {
        (Some(cpu_delta), Some(system_delta)) if cpu_delta > 0 && system_delta > 0 => {
            round(cpu_delta as f64 / system_delta as f64 * online_cpus as f64 * 100.0)
        }
        _ => 0.0,
    }
}

pub fn derive_memory(raw: Option<&RawMemoryStats>) -> MemoryStats {
    let Some(&RawMemoryStats {
        usage: Some(usage),
        limit: Some(limit),
        max_usage: Some(max_usage),
    }) = raw
    else {
        log::debug!("Cannot grab MEM usage, fields missing");
        return MemoryStats::default();
    };

    let usage_percent = (limit > 0).then(|| round(usage as f64 / limit as f64 * 100.0));

    MemoryStats {
        usage: Some(usage),
        limit: Some(limit),
        max_usage: Some(max_usage),
        usage_percent,
    }
}

pub fn derive_network(
    raw: Option<&HashMap<String, RawNetworkStats>>,
    read: Option<DateTime<Utc>>,
    previous: &mut Option<NetworkSample>,
) -> NetworkStats {
    let Some((total_tx, total_rx)) = raw.and_then(sum_interfaces) else {
        log::debug!("Cannot grab NET usage, counters missing");
        return NetworkStats::default();
    };

    let mut stats = NetworkStats {
        total_tx: Some(total_tx),
        total_rx: Some(total_rx),
        speed_tx: None,
        speed_rx: None,
    };

    let Some(read) = read else {
        return stats;
    };

    if let Some(prev) = previous {
        let elapsed = (read - prev.read)
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or(0.0);

        if elapsed > 0.0 {
            stats.speed_tx = speed(prev.total_tx, total_tx, elapsed);
            stats.speed_rx = speed(prev.total_rx, total_rx, elapsed);
        }
    }

    *previous = Some(NetworkSample {
        read,
        total_tx,
        total_rx,
    });

    stats
}

fn sum_interfaces(interfaces: &HashMap<String, RawNetworkStats>) -> Option<(u64, u64)> {
    if interfaces.is_empty() {
        return None;
    }
    let tx = interfaces.values().map(|net| net.tx_bytes).sum::<Option<u64>>()?;
    let rx = interfaces.values().map(|net| net.rx_bytes).sum::<Option<u64>>()?;
    Some((tx, rx))
}

/// Counters running backwards (reset without an identity change) produce no
/// rate.
fn speed(previous: u64, current: u64, elapsed_secs: f64) -> Option<f64> {
    current
        .checked_sub(previous)
        .map(|delta| round(delta as f64 / elapsed_secs))
}
