use crate::runtime::RuntimeClient;
use docker_monitor_shared::DaemonInfo;
use std::sync::Arc;

/// Reads daemon-level version info. Holds no state between calls.
pub struct HostInfoReader {
    client: Arc<dyn RuntimeClient>,
}

impl HostInfoReader {
    pub fn new(client: Arc<dyn RuntimeClient>) -> Self {
        Self { client }
    }

    /// Never fails; an unreachable daemon yields an empty [`DaemonInfo`].
    pub async fn get_info(&self) -> DaemonInfo {
        let info = self.client.daemon_info().await;
        if info.is_empty() {
            log::debug!("Docker daemon info is empty");
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDocker;

    #[tokio::test]
    async fn delegates_to_the_client() {
        let docker = Arc::new(FakeDocker::new());
        docker.set_daemon_info(DaemonInfo {
            version: Some("27.3.1".to_string()),
            api_version: Some("1.47".to_string()),
            os: Some("linux".to_string()),
            arch: Some("amd64".to_string()),
            kernel_version: Some("6.8.0".to_string()),
        });

        let reader = HostInfoReader::new(docker);
        let info = reader.get_info().await;
        assert_eq!(info.version.as_deref(), Some("27.3.1"));
        assert_eq!(info.kernel_version.as_deref(), Some("6.8.0"));
    }

    #[tokio::test]
    async fn unreachable_daemon_gives_empty_info() {
        let reader = HostInfoReader::new(Arc::new(FakeDocker::new()));
        assert!(reader.get_info().await.is_empty());
    }
}
