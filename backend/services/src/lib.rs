pub mod catalog;
pub mod derive;
pub mod docker_service;
pub mod error;
pub mod host_info;
pub mod normalizer;
pub mod poller;
pub mod raw_stats;
pub mod runtime;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{MetricDescriptor, MetricKind, MetricScope, MetricValue, CATALOG};
pub use docker_service::DockerService;
pub use error::MonitorError;
pub use host_info::HostInfoReader;
pub use normalizer::ContainerStatsNormalizer;
pub use poller::{PollCoordinator, PollState, Refresh, SharedPollState};
pub use raw_stats::RawStatsSnapshot;
pub use runtime::{ContainerAttributes, ContainerHandle, RuntimeClient};
