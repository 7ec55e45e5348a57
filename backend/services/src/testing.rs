//! In-memory daemon for tests, here and in dependent crates (`testing`
//! feature).

use crate::error::{MonitorError, Result};
use crate::raw_stats::{
    RawCpuStats, RawCpuUsage, RawMemoryStats, RawNetworkStats, RawStatsSnapshot,
};
use crate::runtime::{ContainerAttributes, ContainerHandle, RuntimeClient};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use docker_monitor_shared::{ContainerInfo, DaemonInfo};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// Sample read `secs` after a fixed epoch, with 4 online CPUs and a
/// 1 GiB memory limit.
pub fn raw_sample(secs: i64, total: u64, system: u64, tx: u64, rx: u64) -> RawStatsSnapshot {
    RawStatsSnapshot {
        read: Some(at(secs)),
        cpu_stats: Some(RawCpuStats {
            cpu_usage: Some(RawCpuUsage {
                total_usage: Some(total),
                percpu_usage: None,
            }),
            system_cpu_usage: Some(system),
            online_cpus: Some(4),
        }),
        memory_stats: Some(RawMemoryStats {
            usage: Some(524_288_000),
            limit: Some(1_073_741_824),
            max_usage: Some(629_145_600),
        }),
        networks: Some(HashMap::from([(
            "eth0".to_string(),
            RawNetworkStats {
                tx_bytes: Some(tx),
                rx_bytes: Some(rx),
            },
        )])),
    }
}

struct FakeContainer {
    attrs: ContainerAttributes,
    samples: VecDeque<RawStatsSnapshot>,
}

#[derive(Default)]
pub struct FakeDocker {
    containers: Mutex<HashMap<String, FakeContainer>>,
    daemon: Mutex<DaemonInfo>,
    stats_delay: Mutex<Option<Duration>>,
    listing_error: Mutex<Option<String>>,
}

impl FakeDocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_container(&self, name: &str, id: &str, status: &str) {
        let attrs = ContainerAttributes {
            id: id.to_string(),
            image_tags: vec!["nginx:latest".to_string()],
            status: status.to_string(),
            created: Some(at(-3600)),
            started_at: Some(at(-60)),
            finished_at: Some(at(-1)),
            exit_code: Some(137),
        };
        self.containers.lock().unwrap().insert(
            name.to_string(),
            FakeContainer {
                attrs,
                samples: VecDeque::new(),
            },
        );
    }

    pub fn push_stats(&self, name: &str, sample: RawStatsSnapshot) {
        if let Some(container) = self.containers.lock().unwrap().get_mut(name) {
            container.samples.push_back(sample);
        }
    }

    /// Same name, new identity.
    pub fn recreate(&self, name: &str, new_id: &str) {
        if let Some(container) = self.containers.lock().unwrap().get_mut(name) {
            container.attrs.id = new_id.to_string();
        }
    }

    pub fn remove(&self, name: &str) {
        self.containers.lock().unwrap().remove(name);
    }

    pub fn set_daemon_info(&self, info: DaemonInfo) {
        *self.daemon.lock().unwrap() = info;
    }

    pub fn set_stats_delay(&self, delay: Duration) {
        *self.stats_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_listing(&self, reason: &str) {
        *self.listing_error.lock().unwrap() = Some(reason.to_string());
    }
}

#[async_trait]
impl RuntimeClient for FakeDocker {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        if let Some(reason) = self.listing_error.lock().unwrap().clone() {
            return Err(MonitorError::Fetch(reason));
        }
        let containers = self.containers.lock().unwrap();
        let mut result: Vec<ContainerInfo> = containers
            .iter()
            .map(|(name, container)| ContainerInfo {
                id: container.attrs.id.clone(),
                name: name.clone(),
                image: container.attrs.image_tags.join(","),
                status: container.attrs.status.clone(),
                created: container.attrs.created,
            })
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn daemon_info(&self) -> DaemonInfo {
        self.daemon.lock().unwrap().clone()
    }

    async fn resolve_container(&self, name: &str) -> Result<ContainerHandle> {
        let containers = self.containers.lock().unwrap();
        let container = containers
            .get(name)
            .ok_or_else(|| MonitorError::NotFound(name.to_string()))?;
        Ok(ContainerHandle {
            id: container.attrs.id.clone(),
            name: name.to_string(),
        })
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerAttributes> {
        self.containers
            .lock()
            .unwrap()
            .values()
            .find(|container| container.attrs.id == id)
            .map(|container| container.attrs.clone())
            .ok_or_else(|| MonitorError::NotFound(id.to_string()))
    }

    async fn container_stats(&self, id: &str) -> Result<RawStatsSnapshot> {
        let delay = *self.stats_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.containers
            .lock()
            .unwrap()
            .values_mut()
            .find(|container| container.attrs.id == id)
            .ok_or_else(|| MonitorError::NotFound(id.to_string()))?
            .samples
            .pop_front()
            .ok_or_else(|| MonitorError::Fetch(format!("no stats available for '{}'", id)))
    }
}
