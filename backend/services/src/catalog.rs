//! Static table of the metrics a dashboard can subscribe to.
//!
//! Each entry carries its display metadata and a pure extraction function,
//! so presenting a metric is a table lookup rather than a branch on its id.

use crate::derive::round;
use chrono::{DateTime, Utc};
use docker_monitor_shared::{ContainerSnapshot, DaemonInfo};
use serde::Serialize;
use std::collections::BTreeMap;

const BYTES_PER_KB: f64 = 1024.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

const ICON_RUNNING: &str = "mdi:checkbox-marked-circle-outline";
const ICON_NOT_RUNNING: &str = "mdi:checkbox-blank-circle-outline";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    DockerVersion,
    ContainerStatus,
    ContainerUptime,
    ContainerImage,
    CpuPercentage,
    MemoryUsage,
    MemoryPercentage,
    NetworkSpeedUp,
    NetworkSpeedDown,
    NetworkTotalUp,
    NetworkTotalDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricScope {
    Daemon,
    Container,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Text(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
}

#[derive(Clone, Copy)]
pub enum Extractor {
    Daemon(fn(&DaemonInfo) -> Option<MetricValue>),
    Container(fn(&ContainerSnapshot) -> Option<MetricValue>),
}

#[derive(Clone, Copy)]
pub struct MetricDescriptor {
    pub kind: MetricKind,
    pub id: &'static str,
    pub label: &'static str,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
    pub device_class: Option<&'static str>,
    pub extract: Extractor,
}

impl MetricDescriptor {
    pub fn scope(&self) -> MetricScope {
        match self.extract {
            Extractor::Daemon(_) => MetricScope::Daemon,
            Extractor::Container(_) => MetricScope::Container,
        }
    }

    /// Value of a daemon metric; `None` for container metrics.
    pub fn daemon_value(&self, info: &DaemonInfo) -> Option<MetricValue> {
        match self.extract {
            Extractor::Daemon(extract) => extract(info),
            Extractor::Container(_) => None,
        }
    }

    /// Value of a container metric; `None` for daemon metrics.
    pub fn container_value(&self, snapshot: &ContainerSnapshot) -> Option<MetricValue> {
        match self.extract {
            Extractor::Container(extract) => extract(snapshot),
            Extractor::Daemon(_) => None,
        }
    }

    /// The status icon follows the container state; everything else is fixed.
    pub fn icon_for(&self, value: Option<&MetricValue>) -> &'static str {
        match (self.kind, value) {
            (MetricKind::ContainerStatus, Some(MetricValue::Text(status))) if status == "running" => {
                ICON_RUNNING
            }
            (MetricKind::ContainerStatus, _) => ICON_NOT_RUNNING,
            _ => self.icon,
        }
    }

    /// Secondary values shown next to a container metric.
    pub fn attributes(&self, snapshot: &ContainerSnapshot) -> BTreeMap<&'static str, String> {
        let mut attributes = BTreeMap::new();
        match self.kind {
            MetricKind::ContainerStatus => {
                if let Some(image) = snapshot.info.image.first() {
                    attributes.insert("image", image.clone());
                }
                if let Some(created) = snapshot.info.created {
                    attributes.insert("created", created.to_rfc3339());
                }
                if let Some(started_at) = snapshot.info.started_at {
                    attributes.insert("started_at", started_at.to_rfc3339());
                }
            }
            MetricKind::CpuPercentage => {
                if let Some(online_cpus) = snapshot.cpu.online_cpus {
                    attributes.insert("online_cpus", online_cpus.to_string());
                }
            }
            MetricKind::MemoryUsage | MetricKind::MemoryPercentage => {
                if let Some(limit) = snapshot.memory.limit {
                    attributes.insert("memory_limit", format!("{:?} MB", to_mb(limit)));
                }
            }
            _ => {}
        }
        attributes
    }
}

impl std::fmt::Debug for MetricDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricDescriptor")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("unit", &self.unit)
            .field("scope", &self.scope())
            .finish()
    }
}

pub static CATALOG: [MetricDescriptor; 11] = [
    MetricDescriptor {
        kind: MetricKind::DockerVersion,
        id: "docker_version",
        label: "Docker Version",
        unit: None,
        icon: "mdi:information-outline",
        device_class: None,
        extract: Extractor::Daemon(|info| info.version.clone().map(MetricValue::Text)),
    },
    MetricDescriptor {
        kind: MetricKind::ContainerStatus,
        id: "container_status",
        label: "Status",
        unit: None,
        icon: ICON_RUNNING,
        device_class: None,
        extract: Extractor::Container(|s| Some(MetricValue::Text(s.info.status.clone()))),
    },
    MetricDescriptor {
        kind: MetricKind::ContainerUptime,
        id: "container_uptime",
        label: "Up Time",
        unit: None,
        icon: "mdi:clock",
        device_class: Some("timestamp"),
        extract: Extractor::Container(|s| s.info.started_at.map(MetricValue::Timestamp)),
    },
    MetricDescriptor {
        kind: MetricKind::ContainerImage,
        id: "container_image",
        label: "Image",
        unit: None,
        icon: "mdi:information-outline",
        device_class: None,
        extract: Extractor::Container(|s| s.info.image.first().cloned().map(MetricValue::Text)),
    },
    MetricDescriptor {
        kind: MetricKind::CpuPercentage,
        id: "container_cpu_percentage_usage",
        label: "CPU use",
        unit: Some("%"),
        icon: "mdi:chip",
        device_class: None,
        extract: Extractor::Container(|s| s.cpu.percentage.map(MetricValue::Number)),
    },
    MetricDescriptor {
        kind: MetricKind::MemoryUsage,
        id: "container_memory_usage",
        label: "Memory use",
        unit: Some("MB"),
        icon: "mdi:memory",
        device_class: None,
        extract: Extractor::Container(|s| s.memory.usage.map(|b| MetricValue::Number(to_mb(b)))),
    },
    MetricDescriptor {
        kind: MetricKind::MemoryPercentage,
        id: "container_memory_percentage_usage",
        label: "Memory use (percent)",
        unit: Some("%"),
        icon: "mdi:memory",
        device_class: None,
        extract: Extractor::Container(|s| s.memory.usage_percent.map(MetricValue::Number)),
    },
    MetricDescriptor {
        kind: MetricKind::NetworkSpeedUp,
        id: "container_network_speed_up",
        label: "Network speed Up",
        unit: Some("kB/s"),
        icon: "mdi:upload",
        device_class: None,
        extract: Extractor::Container(|s| s.network.speed_tx.map(|b| MetricValue::Number(to_kb(b)))),
    },
    MetricDescriptor {
        kind: MetricKind::NetworkSpeedDown,
        id: "container_network_speed_down",
        label: "Network speed Down",
        unit: Some("kB/s"),
        icon: "mdi:download",
        device_class: None,
        extract: Extractor::Container(|s| s.network.speed_rx.map(|b| MetricValue::Number(to_kb(b)))),
    },
    MetricDescriptor {
        kind: MetricKind::NetworkTotalUp,
        id: "container_network_total_up",
        label: "Network total Up",
        unit: Some("MB"),
        icon: "mdi:upload",
        device_class: None,
        extract: Extractor::Container(|s| s.network.total_tx.map(|b| MetricValue::Number(to_mb(b)))),
    },
    MetricDescriptor {
        kind: MetricKind::NetworkTotalDown,
        id: "container_network_total_down",
        label: "Network total Down",
        unit: Some("MB"),
        icon: "mdi:download",
        device_class: None,
        extract: Extractor::Container(|s| s.network.total_rx.map(|b| MetricValue::Number(to_mb(b)))),
    },
];

fn to_mb(bytes: u64) -> f64 {
    round(bytes as f64 / BYTES_PER_MB)
}

fn to_kb(bytes_per_sec: f64) -> f64 {
    round(bytes_per_sec / BYTES_PER_KB)
}

pub fn descriptor(id: &str) -> Option<&'static MetricDescriptor> {
    CATALOG.iter().find(|d| d.id == id)
}

impl MetricKind {
    pub fn descriptor(self) -> &'static MetricDescriptor {
        let index = match self {
            MetricKind::DockerVersion => 0,
            MetricKind::ContainerStatus => 1,
            MetricKind::ContainerUptime => 2,
            MetricKind::ContainerImage => 3,
            MetricKind::CpuPercentage => 4,
            MetricKind::MemoryUsage => 5,
            MetricKind::MemoryPercentage => 6,
            MetricKind::NetworkSpeedUp => 7,
            MetricKind::NetworkSpeedDown => 8,
            MetricKind::NetworkTotalUp => 9,
            MetricKind::NetworkTotalDown => 10,
        };
        &CATALOG[index]
    }
}

pub fn daemon_metrics() -> impl Iterator<Item = &'static MetricDescriptor> {
    CATALOG.iter().filter(|d| d.scope() == MetricScope::Daemon)
}

pub fn container_metrics() -> impl Iterator<Item = &'static MetricDescriptor> {
    CATALOG.iter().filter(|d| d.scope() == MetricScope::Container)
}

/// Every id in the catalog, in table order.
pub fn all_ids() -> Vec<&'static str> {
    CATALOG.iter().map(|d| d.id).collect()
}
