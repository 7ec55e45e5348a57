use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// One unprocessed stats sample as the daemon reports it. Field names and
/// nesting follow the Docker stats payload; any of them may be missing
/// depending on the container state and the cgroup version of the host.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawStatsSnapshot {
    #[serde(default)]
    pub read: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cpu_stats: Option<RawCpuStats>,
    #[serde(default)]
    pub memory_stats: Option<RawMemoryStats>,
    #[serde(default)]
    pub networks: Option<HashMap<String, RawNetworkStats>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCpuStats {
    #[serde(default)]
    pub cpu_usage: Option<RawCpuUsage>,
    #[serde(default)]
    pub system_cpu_usage: Option<u64>,
    #[serde(default)]
    pub online_cpus: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCpuUsage {
    #[serde(default)]
    pub total_usage: Option<u64>,
    /// Only reported by older API versions and cgroup v1 hosts.
    #[serde(default)]
    pub percpu_usage: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawMemoryStats {
    #[serde(default)]
    pub usage: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub max_usage: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawNetworkStats {
    #[serde(default)]
    pub rx_bytes: Option<u64>,
    #[serde(default)]
    pub tx_bytes: Option<u64>,
}

/// Parses a daemon timestamp. Docker reports unset times (for instance the
/// finish time of a running container) as `0001-01-01T00:00:00Z`; those map
/// to `None`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))?;
    (parsed.timestamp() > 0).then_some(parsed)
}
