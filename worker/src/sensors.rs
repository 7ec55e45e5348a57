use docker_monitor_services::catalog::{self, MetricDescriptor, MetricValue};
use docker_monitor_services::PollState;
use docker_monitor_shared::{ContainerSnapshot, DaemonInfo};
use serde::Serialize;
use std::collections::BTreeMap;

/// One published value: a catalog metric for one monitored entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    /// Container name, or `None` for daemon metrics.
    pub container: Option<String>,
    pub metric: &'static str,
    pub name: String,
    pub state: Option<MetricValue>,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
    pub device_class: Option<&'static str>,
    pub attributes: BTreeMap<&'static str, String>,
    pub available: bool,
}

fn base_reading(descriptor: &MetricDescriptor, name: String, available: bool) -> SensorReading {
    SensorReading {
        container: None,
        metric: descriptor.id,
        name,
        state: None,
        unit: descriptor.unit,
        icon: descriptor.icon,
        device_class: descriptor.device_class,
        attributes: BTreeMap::new(),
        available,
    }
}

pub fn daemon_readings(
    platform: &str,
    conditions: &[&'static str],
    poll: &PollState<DaemonInfo>,
) -> Vec<SensorReading> {
    catalog::daemon_metrics()
        .filter(|d| conditions.contains(&d.id))
        .map(|descriptor| {
            let mut reading = base_reading(
                descriptor,
                format!("{} {}", platform, descriptor.label),
                poll.last_update_success,
            );
            reading.state = poll.data.as_ref().and_then(|info| descriptor.daemon_value(info));
            reading
        })
        .collect()
}

/// Readings for one container. A failed last poll marks every reading
/// unavailable but keeps the values of the last good poll.
pub fn container_readings(
    platform: &str,
    container: &str,
    conditions: &[&'static str],
    poll: &PollState<ContainerSnapshot>,
) -> Vec<SensorReading> {
    catalog::container_metrics()
        .filter(|d| conditions.contains(&d.id))
        .map(|descriptor| {
            let mut reading = base_reading(
                descriptor,
                format!("{} {} {}", platform, container, descriptor.label),
                poll.last_update_success,
            );
            reading.container = Some(container.to_string());
            if let Some(snapshot) = &poll.data {
                reading.state = descriptor.container_value(snapshot);
                reading.attributes = descriptor.attributes(snapshot);
            }
            reading.icon = descriptor.icon_for(reading.state.as_ref());
            reading
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docker_monitor_shared::{ContainerStateInfo, CpuStats, MemoryStats, NetworkStats};

    fn exited_snapshot() -> ContainerSnapshot {
        ContainerSnapshot {
            name: "backup".to_string(),
            info: ContainerStateInfo {
                id: "abc".to_string(),
                image: vec!["restic:0.17".to_string()],
                status: "exited".to_string(),
                created: Some(Utc::now()),
                started_at: None,
                finished_at: Some(Utc::now()),
                exit_code: Some(0),
            },
            read: None,
            cpu: CpuStats::default(),
            memory: MemoryStats::default(),
            network: NetworkStats::default(),
        }
    }

    #[test]
    fn container_readings_follow_the_monitored_conditions() {
        let poll = PollState {
            data: Some(exited_snapshot()),
            last_update_success: true,
            last_error: None,
            last_updated: Some(Utc::now()),
        };
        let readings = container_readings(
            "docker_monitor",
            "backup",
            &["docker_version", "container_status", "container_cpu_percentage_usage"],
            &poll,
        );

        assert_eq!(readings.len(), 2);
        let status = &readings[0];
        assert_eq!(status.name, "docker_monitor backup Status");
        assert_eq!(status.state, Some(MetricValue::Text("exited".into())));
        assert_eq!(status.icon, "mdi:checkbox-blank-circle-outline");
        assert_eq!(status.attributes["image"], "restic:0.17");
        assert!(status.available);

        let cpu = &readings[1];
        assert_eq!(cpu.state, None);
        assert_eq!(cpu.unit, Some("%"));
    }

    #[test]
    fn failed_poll_marks_readings_unavailable() {
        let poll = PollState {
            data: Some(exited_snapshot()),
            last_update_success: false,
            last_error: Some("timed out after 10s".to_string()),
            last_updated: None,
        };
        let readings = container_readings("dm", "backup", &["container_image"], &poll);
        assert_eq!(readings.len(), 1);
        assert!(!readings[0].available);
        assert_eq!(readings[0].state, Some(MetricValue::Text("restic:0.17".into())));
    }

    #[test]
    fn daemon_readings_only_publish_daemon_metrics() {
        let poll = PollState {
            data: Some(DaemonInfo {
                version: Some("27.3.1".to_string()),
                ..Default::default()
            }),
            last_update_success: true,
            last_error: None,
            last_updated: None,
        };
        let readings = daemon_readings("dm", &catalog::all_ids(), &poll);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].name, "dm Docker Version");
        assert_eq!(readings[0].state, Some(MetricValue::Text("27.3.1".into())));
        assert_eq!(readings[0].container, None);
    }
}
