use crate::error::Result;
use crate::raw_stats::RawStatsSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docker_monitor_shared::{ContainerInfo, DaemonInfo};

/// Binding between a stable container name and the daemon object currently
/// carrying it. The id changes whenever the container is recreated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

/// Reloaded attributes of a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerAttributes {
    pub id: String,
    pub image_tags: Vec<String>,
    pub status: String,
    pub created: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i64>,
}

/// Read-only access to a container daemon.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Every container known to the daemon, stopped ones included.
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>>;

    /// Best-effort daemon version info; empty when the daemon cannot be
    /// queried.
    async fn daemon_info(&self) -> DaemonInfo;

    /// Looks a container up by name. Fails with `NotFound` if none exists.
    async fn resolve_container(&self, name: &str) -> Result<ContainerHandle>;

    /// Reloads the attributes of the container with this id. Fails if the
    /// container no longer exists.
    async fn inspect_container(&self, id: &str) -> Result<ContainerAttributes>;

    /// Takes a single, non-streaming stats sample.
    async fn container_stats(&self, id: &str) -> Result<RawStatsSnapshot>;
}
