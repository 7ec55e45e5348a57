use crate::config::Config;
use docker_monitor_services::{
    ContainerStatsNormalizer, HostInfoReader, MonitorError, PollCoordinator, RuntimeClient,
    SharedPollState,
};
use docker_monitor_shared::{ContainerSnapshot, DaemonInfo};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Latest poll state of every monitored entity, keyed by container name.
#[derive(Clone)]
pub struct Monitors {
    pub daemon: SharedPollState<DaemonInfo>,
    pub containers: BTreeMap<String, SharedPollState<ContainerSnapshot>>,
}

pub struct WorkerService {
    docker: Arc<dyn RuntimeClient>,
    config: Config,
}

impl WorkerService {
    pub fn new(docker: Arc<dyn RuntimeClient>, config: Config) -> Self {
        Self { docker, config }
    }

    /// Names to monitor: the configured list, or every container the daemon
    /// knows about right now.
    async fn container_names(&self) -> Result<Vec<String>, MonitorError> {
        match &self.config.containers {
            Some(names) => Ok(names.clone()),
            None => {
                let containers = self.docker.list_containers().await?;
                Ok(containers.into_iter().map(|c| c.name).collect())
            }
        }
    }

    /// Builds a coordinator per monitored entity, fetches initial data so
    /// readers have something right away, and spawns the polling loops.
    pub async fn start(&self) -> Result<(Monitors, Vec<JoinHandle<()>>), MonitorError> {
        log::info!("Worker service starting with configuration:");
        log::info!("  - Scan interval: {:?}", self.config.scan_interval);
        log::info!("  - Poll timeout: {:?}", self.config.poll_timeout);
        log::info!("  - Monitored conditions: {:?}", self.config.monitored_conditions);

        let mut tasks = Vec::new();

        let daemon = PollCoordinator::new(
            "docker info",
            HostInfoReader::new(self.docker.clone()),
            self.config.scan_interval,
            self.config.poll_timeout,
        );
        daemon.refresh().await;
        log::debug!("Polling {}", daemon.name());
        let daemon_state = daemon.state();
        tasks.push(tokio::spawn(daemon.run()));

        let mut containers = BTreeMap::new();
        for name in self.container_names().await? {
            let normalizer = match ContainerStatsNormalizer::new(self.docker.clone(), &name).await {
                Ok(normalizer) => normalizer,
                Err(e) => {
                    log::warn!("Skipping container '{}': {}", name, e);
                    continue;
                }
            };

            log::debug!("Initialize sensors for container '{}'", normalizer.name());
            let coordinator = PollCoordinator::new(
                format!("container stats for '{}'", name),
                normalizer,
                self.config.scan_interval,
                self.config.poll_timeout,
            );
            coordinator.refresh().await;
            log::debug!("Polling {}", coordinator.name());
            containers.insert(name, coordinator.state());
            tasks.push(tokio::spawn(coordinator.run()));
        }

        log::info!("Monitoring {} containers", containers.len());

        Ok((
            Monitors {
                daemon: daemon_state,
                containers,
            },
            tasks,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docker_monitor_services::testing::{raw_sample, FakeDocker};
    use docker_monitor_shared::DaemonInfo;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    async fn start(docker: Arc<FakeDocker>, config: Config) -> Result<Monitors, MonitorError> {
        let (monitors, tasks) = WorkerService::new(docker, config).start().await?;
        for task in tasks {
            task.abort();
        }
        Ok(monitors)
    }

    #[tokio::test]
    async fn monitors_every_container_found_at_startup() {
        let docker = Arc::new(FakeDocker::new());
        docker.add_container("web", "c1", "running");
        docker.add_container("db", "c2", "exited");
        docker.push_stats("web", raw_sample(0, 100, 1000, 0, 0));
        docker.set_daemon_info(DaemonInfo {
            version: Some("27.3.1".to_string()),
            ..Default::default()
        });

        let monitors = start(docker, config(&[])).await.unwrap();

        let names: Vec<&String> = monitors.containers.keys().collect();
        assert_eq!(names, vec!["db", "web"]);

        let daemon = monitors.daemon.read().await.clone();
        assert_eq!(daemon.data.unwrap().version.as_deref(), Some("27.3.1"));

        let web = monitors.containers["web"].read().await.clone();
        assert!(web.last_update_success);
        assert_eq!(web.data.unwrap().name, "web");

        // No sample queued, so the first poll failed but the monitor exists
        let db = monitors.containers["db"].read().await.clone();
        assert!(!db.last_update_success);
    }

    #[tokio::test]
    async fn configured_names_that_do_not_resolve_are_skipped() {
        let docker = Arc::new(FakeDocker::new());
        docker.add_container("web", "c1", "running");
        docker.add_container("db", "c2", "running");

        let monitors = start(docker, config(&[("CONTAINERS", "web,ghost")])).await.unwrap();

        let names: Vec<&String> = monitors.containers.keys().collect();
        assert_eq!(names, vec!["web"]);
    }

    #[tokio::test]
    async fn empty_daemon_only_monitors_the_daemon() {
        let docker = Arc::new(FakeDocker::new());

        let monitors = start(docker, config(&[])).await.unwrap();

        assert!(monitors.containers.is_empty());
        assert!(monitors.daemon.read().await.last_update_success);
    }

    #[tokio::test]
    async fn failed_listing_aborts_setup() {
        let docker = Arc::new(FakeDocker::new());
        docker.add_container("web", "c1", "running");
        docker.fail_listing("daemon went away");

        let err = start(docker, config(&[])).await.err().unwrap();
        assert!(matches!(err, MonitorError::Fetch(reason) if reason == "daemon went away"));
    }
}
