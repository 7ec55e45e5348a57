use crate::error::{MonitorError, Result};
use crate::raw_stats::{
    parse_timestamp, RawCpuStats, RawCpuUsage, RawMemoryStats, RawNetworkStats, RawStatsSnapshot,
};
use crate::runtime::{ContainerAttributes, ContainerHandle, RuntimeClient};
use async_trait::async_trait;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerInspectResponse, ContainerStatsResponse};
use bollard::query_parameters::{InspectContainerOptions, ListContainersOptions, StatsOptions};
use bollard::Docker;
use chrono::Utc;
use docker_monitor_shared::{ContainerInfo, DaemonInfo};
use futures::StreamExt;

const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Daemon address meaning "use the platform defaults" (`DOCKER_HOST` or the
/// local socket).
pub const LOCAL_DEFAULTS: &str = "local";

pub struct DockerService {
    docker: Docker,
}

impl DockerService {
    /// Connects to the daemon at `address` and checks that it answers.
    ///
    /// Accepts `unix://` socket paths, `tcp://` or `http://` hosts, and
    /// [`LOCAL_DEFAULTS`].
    pub async fn connect(address: &str) -> Result<Self> {
        let connection_error = |e: BollardError| MonitorError::Connection {
            address: address.to_string(),
            reason: e.to_string(),
        };

        let docker = if address == LOCAL_DEFAULTS {
            log::info!("Using Docker local defaults");
            Docker::connect_with_local_defaults().map_err(connection_error)?
        } else if let Some(socket_path) = unix_socket_path(address) {
            log::info!("Connecting to Docker socket: {}", socket_path);
            Docker::connect_with_socket(&socket_path, CONNECT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
                .map_err(connection_error)?
        } else if address.starts_with("tcp://") || address.starts_with("http://") {
            log::info!("Connecting to Docker host: {}", address);
            Docker::connect_with_http(address, CONNECT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
                .map_err(connection_error)?
        } else {
            log::error!("Unsupported Docker address: {}", address);
            return Err(MonitorError::Unavailable(address.to_string()));
        };

        docker.ping().await.map_err(|e| {
            log::error!("Can not connect to Docker ({})", e);
            connection_error(e)
        })?;
        log::info!("Docker connection successful");

        Ok(Self { docker })
    }

    async fn image_tags(&self, inspect: &ContainerInspectResponse) -> Vec<String> {
        let Some(image_id) = inspect.image.as_deref() else {
            return Vec::new();
        };

        match self.docker.inspect_image(image_id).await {
            Ok(image) => image.repo_tags.unwrap_or_default(),
            Err(e) => {
                log::debug!("Failed to inspect image {}: {}", image_id, e);
                // Fall back to the reference the container was created from
                inspect
                    .config
                    .as_ref()
                    .and_then(|config| config.image.clone())
                    .into_iter()
                    .collect()
            }
        }
    }
}

#[async_trait]
impl RuntimeClient for DockerService {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let options = ListContainersOptions {
            all: true,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| translate(e, "containers"))?;

        log::debug!("Docker API returned {} containers", containers.len());

        let mut result = Vec::new();
        for container in containers {
            let Some(id) = container.id.filter(|id| !id.is_empty()) else {
                log::warn!("Skipping container without ID: names={:?}", container.names);
                continue;
            };
            let name = container
                .names
                .unwrap_or_default()
                .first()
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_else(|| id.clone());

            log::debug!("Found container: {}", name);
            result.push(ContainerInfo {
                id,
                name,
                image: container.image.unwrap_or_default(),
                status: container.status.unwrap_or_default(),
                created: container
                    .created
                    .map(|ts| chrono::DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)),
            });
        }

        Ok(result)
    }

    async fn daemon_info(&self) -> DaemonInfo {
        match self.docker.version().await {
            Ok(raw) => DaemonInfo {
                version: raw.version,
                api_version: raw.api_version,
                os: raw.os,
                arch: raw.arch,
                kernel_version: raw.kernel_version,
            },
            Err(e) => {
                log::error!("Cannot get Docker version ({})", e);
                DaemonInfo::default()
            }
        }
    }

    async fn resolve_container(&self, name: &str) -> Result<ContainerHandle> {
        let inspect = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(|e| translate(e, name))?;

        let id = inspect
            .id
            .ok_or_else(|| MonitorError::Fetch(format!("container '{}' has no id", name)))?;

        Ok(ContainerHandle {
            id,
            name: name.to_string(),
        })
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerAttributes> {
        let inspect = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| translate(e, id))?;

        let image_tags = self.image_tags(&inspect).await;
        Ok(container_attributes(inspect, id, image_tags))
    }

    async fn container_stats(&self, id: &str) -> Result<RawStatsSnapshot> {
        let options = StatsOptions {
            stream: false,
            ..Default::default()
        };

        let stats = self
            .docker
            .stats(id, Some(options))
            .next()
            .await
            .ok_or_else(|| MonitorError::Fetch(format!("no stats available for '{}'", id)))?
            .map_err(|e| translate(e, id))?;

        Ok(raw_snapshot(stats))
    }
}

/// Socket path of a `unix://` address. Accepts both
/// `unix:///var/run/docker.sock` and `unix://var/run/docker.sock`.
fn unix_socket_path(address: &str) -> Option<String> {
    let path = address.strip_prefix("unix://")?;
    Some(format!("/{}", path.trim_start_matches('/')))
}

fn container_attributes(
    inspect: ContainerInspectResponse,
    id: &str,
    image_tags: Vec<String>,
) -> ContainerAttributes {
    let state = inspect.state.unwrap_or_default();

    ContainerAttributes {
        id: inspect.id.unwrap_or_else(|| id.to_string()),
        image_tags,
        status: state.status.map(|s| s.to_string()).unwrap_or_default(),
        created: inspect.created.as_deref().and_then(parse_timestamp),
        started_at: state.started_at.as_deref().and_then(parse_timestamp),
        finished_at: state.finished_at.as_deref().and_then(parse_timestamp),
        exit_code: state.exit_code,
    }
}

fn translate(err: BollardError, subject: &str) -> MonitorError {
    match err {
        BollardError::DockerResponseServerError { status_code: 404, .. } => {
            MonitorError::NotFound(subject.to_string())
        }
        other => MonitorError::Fetch(other.to_string()),
    }
}

fn raw_snapshot(stats: ContainerStatsResponse) -> RawStatsSnapshot {
    RawStatsSnapshot {
        read: stats.read.as_deref().and_then(parse_timestamp),
        cpu_stats: stats.cpu_stats.map(|cpu| RawCpuStats {
            cpu_usage: cpu.cpu_usage.map(|usage| RawCpuUsage {
                total_usage: usage.total_usage,
                percpu_usage: usage.percpu_usage,
            }),
            system_cpu_usage: cpu.system_cpu_usage,
            online_cpus: cpu.online_cpus.map(u64::from),
        }),
        memory_stats: stats.memory_stats.map(|memory| RawMemoryStats {
            usage: memory.usage,
            limit: memory.limit,
            max_usage: memory.max_usage,
        }),
        networks: stats.networks.map(|networks| {
            networks
                .into_iter()
                .map(|(interface, net)| {
                    (
                        interface,
                        RawNetworkStats {
                            rx_bytes: net.rx_bytes,
                            tx_bytes: net.tx_bytes,
                        },
                    )
                })
                .collect()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::derive_memory;

    const STATS_PAYLOAD: &str = r#"{
        "read": "2024-03-01T10:00:05.123456789Z",
        "cpu_stats": {
            "cpu_usage": { "total_usage": 400000000, "percpu_usage": [100000000, 300000000] },
            "system_cpu_usage": 9000000000,
            "online_cpus": 4
        },
        "memory_stats": { "usage": 52428800, "limit": 1073741824 },
        "networks": {
            "eth0": { "rx_bytes": 2048, "tx_bytes": 1024 },
            "eth1": { "rx_bytes": 10, "tx_bytes": 20 }
        }
    }"#;

    #[tokio::test]
    async fn unsupported_address_is_unavailable() {
        let err = DockerService::connect("ssh://docker@nas").await.err().unwrap();
        assert!(matches!(err, MonitorError::Unavailable(address) if address == "ssh://docker@nas"));
    }

    #[test]
    fn missing_objects_map_to_not_found() {
        let err = BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: web".to_string(),
        };
        assert!(translate(err, "web").is_not_found());

        let err = BollardError::DockerResponseServerError {
            status_code: 500,
            message: "boom".to_string(),
        };
        assert!(matches!(translate(err, "web"), MonitorError::Fetch(_)));
    }

    #[test]
    fn unix_addresses_reduce_to_one_socket_path() {
        assert_eq!(
            unix_socket_path("unix:///var/run/docker.sock").as_deref(),
            Some("/var/run/docker.sock")
        );
        assert_eq!(
            unix_socket_path("unix://var/run/docker.sock").as_deref(),
            Some("/var/run/docker.sock")
        );
        assert_eq!(unix_socket_path("tcp://10.0.0.2:2375"), None);
    }

    #[test]
    fn raw_snapshot_from_docker_payload() {
        let stats: ContainerStatsResponse = serde_json::from_str(STATS_PAYLOAD).unwrap();
        let raw = raw_snapshot(stats);

        assert_eq!(raw.read, parse_timestamp("2024-03-01T10:00:05.123456789Z"));
        assert!(raw.read.is_some());

        let cpu = raw.cpu_stats.as_ref().unwrap();
        assert_eq!(cpu.online_cpus, Some(4));
        assert_eq!(cpu.system_cpu_usage, Some(9_000_000_000));
        let usage = cpu.cpu_usage.as_ref().unwrap();
        assert_eq!(usage.total_usage, Some(400_000_000));
        assert_eq!(usage.percpu_usage.as_ref().map(Vec::len), Some(2));

        let memory = raw.memory_stats.as_ref().unwrap();
        assert_eq!(memory.usage, Some(52_428_800));
        assert_eq!(memory.max_usage, None);

        let networks = raw.networks.as_ref().unwrap();
        assert_eq!(networks.len(), 2);
        assert_eq!(networks["eth0"].rx_bytes, Some(2048));
        assert_eq!(networks["eth1"].tx_bytes, Some(20));
    }

    #[test]
    fn payload_without_max_usage_has_no_memory_block() {
        let stats: ContainerStatsResponse = serde_json::from_str(STATS_PAYLOAD).unwrap();
        let raw = raw_snapshot(stats);

        assert!(derive_memory(raw.memory_stats.as_ref()).is_empty());
    }

    #[test]
    fn zero_finish_time_is_unset() {
        let inspect: ContainerInspectResponse = serde_json::from_str(
            r#"{
                "Id": "abc123",
                "Created": "2024-03-01T09:00:00.000000000Z",
                "State": {
                    "Status": "running",
                    "StartedAt": "2024-03-01T10:00:00.5Z",
                    "FinishedAt": "0001-01-01T00:00:00Z",
                    "ExitCode": 0
                }
            }"#,
        )
        .unwrap();

        let attrs = container_attributes(inspect, "web", vec!["nginx:latest".to_string()]);
        assert_eq!(attrs.id, "abc123");
        assert_eq!(attrs.status, "running");
        assert_eq!(attrs.started_at, parse_timestamp("2024-03-01T10:00:00.5Z"));
        assert!(attrs.started_at.is_some());
        assert_eq!(attrs.finished_at, None);
        assert_eq!(attrs.exit_code, Some(0));
        assert_eq!(attrs.image_tags, vec!["nginx:latest".to_string()]);
    }
}
