use crate::derive::{derive_cpu, derive_memory, derive_network, PreviousSample};
use crate::error::{MonitorError, Result};
use crate::runtime::{ContainerAttributes, ContainerHandle, RuntimeClient};
use docker_monitor_shared::{
    ContainerSnapshot, ContainerStateInfo, CpuStats, MemoryStats, NetworkStats,
};
use std::sync::Arc;

/// Per-container stats engine. Owns the handle for one container name and
/// the counter baselines of the identity that handle points to.
pub struct ContainerStatsNormalizer {
    client: Arc<dyn RuntimeClient>,
    name: String,
    handle: ContainerHandle,
    previous: PreviousSample,
}

impl ContainerStatsNormalizer {
    /// Resolves `name` against the daemon and binds to the container found.
    pub async fn new(client: Arc<dyn RuntimeClient>, name: &str) -> Result<Self> {
        let handle = client.resolve_container(name).await?;
        Ok(Self::with_handle(client, handle))
    }

    pub fn with_handle(client: Arc<dyn RuntimeClient>, handle: ContainerHandle) -> Self {
        Self {
            client,
            name: handle.name.clone(),
            handle,
            previous: PreviousSample::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &ContainerHandle {
        &self.handle
    }

    pub fn previous_sample(&self) -> &PreviousSample {
        &self.previous
    }

    /// Binds to a new container identity. Counter history belongs to the old
    /// identity, so it goes with it.
    fn reset_identity(&mut self, handle: ContainerHandle) {
        log::info!(
            "Container {} rebound from {} to {}",
            self.name,
            self.handle.id,
            handle.id
        );
        self.handle = handle;
        self.previous = PreviousSample::default();
    }

    async fn reload(&mut self) -> Result<ContainerAttributes> {
        match self.client.inspect_container(&self.handle.id).await {
            Ok(attrs) => Ok(attrs),
            Err(e) => {
                log::debug!(
                    "Reload of container {} ({}) failed, resolving by name: {}",
                    self.name,
                    self.handle.id,
                    e
                );
                let handle = self
                    .client
                    .resolve_container(&self.name)
                    .await
                    .map_err(MonitorError::into_fetch)?;
                self.reset_identity(handle);
                self.client
                    .inspect_container(&self.handle.id)
                    .await
                    .map_err(MonitorError::into_fetch)
            }
        }
    }

    pub async fn get_stats(&mut self) -> Result<ContainerSnapshot> {
        log::debug!("Get stats for container {}", self.name);

        let attrs = self.reload().await?;
        let raw = self
            .client
            .container_stats(&self.handle.id)
            .await
            .map_err(MonitorError::into_fetch)?;
        let info = state_info(attrs);

        let snapshot = if info.is_active() {
            log::debug!("Container {} is {}", self.name, info.status);
            ContainerSnapshot {
                name: self.name.clone(),
                read: raw.read,
                cpu: derive_cpu(raw.cpu_stats.as_ref(), &mut self.previous.cpu),
                memory: derive_memory(raw.memory_stats.as_ref()),
                network: derive_network(raw.networks.as_ref(), raw.read, &mut self.previous.network),
                info,
            }
        } else {
            log::debug!("Container {} is not running", self.name);
            ContainerSnapshot {
                name: self.name.clone(),
                read: None,
                cpu: CpuStats::default(),
                memory: MemoryStats::default(),
                network: NetworkStats::default(),
                info,
            }
        };

        log::debug!(
            "Stats for container {} ({}): {:?}",
            self.name,
            self.handle.id,
            snapshot
        );
        Ok(snapshot)
    }
}

/// Active containers report when they started; stopped ones report how and
/// when they finished instead.
fn state_info(attrs: ContainerAttributes) -> ContainerStateInfo {
    let mut info = ContainerStateInfo {
        id: attrs.id,
        image: attrs.image_tags,
        status: attrs.status,
        created: attrs.created,
        started_at: attrs.started_at,
        finished_at: attrs.finished_at,
        exit_code: attrs.exit_code,
    };

    if info.is_active() {
        info.finished_at = None;
        info.exit_code = None;
    } else {
        info.started_at = None;
    }
    info
}
