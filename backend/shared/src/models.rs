use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Container as returned by a daemon listing, running or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub created: Option<DateTime<Utc>>,
}

/// Daemon-level version and platform details. Every field is optional and
/// the whole struct is empty when the daemon could not be queried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaemonInfo {
    pub version: Option<String>,
    pub api_version: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub kernel_version: Option<String>,
}

impl DaemonInfo {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Lifecycle and identity details for one container, taken from its
/// reloaded attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStateInfo {
    pub id: String,
    pub image: Vec<String>,
    pub status: String,
    pub created: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i64>,
}

impl ContainerStateInfo {
    /// Running and paused containers are the only ones with meaningful
    /// resource counters.
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "running" | "paused")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    /// Usage across all online CPUs, `100.0` per fully busy core.
    pub percentage: Option<f64>,
    pub online_cpus: Option<u64>,
}

impl CpuStats {
    pub fn is_empty(&self) -> bool {
        self.percentage.is_none() && self.online_cpus.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub usage: Option<u64>,
    pub limit: Option<u64>,
    pub max_usage: Option<u64>,
    pub usage_percent: Option<f64>,
}

impl MemoryStats {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Cumulative bytes, summed over every interface.
    pub total_tx: Option<u64>,
    pub total_rx: Option<u64>,
    /// Bytes per second since the previous sample.
    pub speed_tx: Option<f64>,
    pub speed_rx: Option<f64>,
}

impl NetworkStats {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Metrics derived for one container on one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub name: String,
    pub info: ContainerStateInfo,
    pub read: Option<DateTime<Utc>>,
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub network: NetworkStats,
}
