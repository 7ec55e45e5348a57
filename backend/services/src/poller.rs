use crate::error::{MonitorError, Result};
use crate::host_info::HostInfoReader;
use crate::normalizer::ContainerStatsNormalizer;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docker_monitor_shared::{ContainerSnapshot, DaemonInfo};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Something a [`PollCoordinator`] can refresh on a schedule.
#[async_trait]
pub trait Refresh: Send + 'static {
    type Output: Clone + Send + Sync + 'static;

    async fn refresh(&mut self) -> Result<Self::Output>;
}

#[async_trait]
impl Refresh for ContainerStatsNormalizer {
    type Output = ContainerSnapshot;

    async fn refresh(&mut self) -> Result<ContainerSnapshot> {
        self.get_stats().await
    }
}

#[async_trait]
impl Refresh for HostInfoReader {
    type Output = DaemonInfo;

    async fn refresh(&mut self) -> Result<DaemonInfo> {
        Ok(self.get_info().await)
    }
}

/// Outcome of the most recent poll plus the last good data.
#[derive(Debug, Clone, Serialize)]
pub struct PollState<T> {
    pub data: Option<T>,
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            data: None,
            last_update_success: false,
            last_error: None,
            last_updated: None,
        }
    }
}

pub type SharedPollState<T> = Arc<RwLock<PollState<T>>>;

/// Drives periodic refreshes of one target.
///
/// Each refresh runs on its own task under a deadline. A refresh that
/// overruns is reported as failed and left to finish in the background; it
/// keeps the target locked, so the following ticks are skipped until it
/// completes and its result is discarded.
pub struct PollCoordinator<R: Refresh> {
    name: String,
    target: Arc<Mutex<R>>,
    state: SharedPollState<R::Output>,
    update_interval: Duration,
    timeout: Duration,
}

impl<R: Refresh> PollCoordinator<R> {
    pub fn new(name: impl Into<String>, target: R, update_interval: Duration, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            target: Arc::new(Mutex::new(target)),
            state: Arc::new(RwLock::new(PollState::default())),
            update_interval,
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SharedPollState<R::Output> {
        self.state.clone()
    }

    pub async fn snapshot(&self) -> PollState<R::Output> {
        self.state.read().await.clone()
    }

    /// Runs one poll cycle and records its outcome. Returns whether it
    /// succeeded.
    pub async fn refresh(&self) -> bool {
        let outcome = self.poll_once().await;
        let mut state = self.state.write().await;

        match outcome {
            Ok(data) => {
                if !state.last_update_success && state.last_error.is_some() {
                    log::info!("Fetching {} data recovered", self.name);
                }
                state.data = Some(data);
                state.last_update_success = true;
                state.last_error = None;
                state.last_updated = Some(Utc::now());
                true
            }
            Err(e) => {
                if state.last_update_success || state.last_error.is_none() {
                    log::warn!("Error fetching {} data: {}", self.name, e);
                } else {
                    log::debug!("Error fetching {} data: {}", self.name, e);
                }
                state.last_update_success = false;
                state.last_error = Some(e.to_string());
                false
            }
        }
    }

    async fn poll_once(&self) -> Result<R::Output> {
        let Ok(mut target) = self.target.clone().try_lock_owned() else {
            return Err(MonitorError::Fetch(format!(
                "previous refresh of {} still running",
                self.name
            )));
        };

        let task = tokio::spawn(async move { target.refresh().await });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result.map_err(MonitorError::into_fetch),
            Ok(Err(join_error)) => Err(MonitorError::Fetch(format!(
                "refresh task failed: {}",
                join_error
            ))),
            Err(_) => Err(MonitorError::Fetch(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Refreshes on every tick until the task is dropped. The first tick
    /// fires one interval after start; call [`Self::refresh`] beforehand to
    /// have data right away.
    pub async fn run(self) {
        log::info!(
            "Polling {} every {:?} (timeout {:?})",
            self.name,
            self.update_interval,
            self.timeout
        );

        let start = tokio::time::Instant::now() + self.update_interval;
        let mut ticker = tokio::time::interval_at(start, self.update_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }
}
