use anyhow::{anyhow, bail, Result};
use docker_monitor_services::catalog;
use std::env;
use std::time::Duration;

pub const DEFAULT_NAME: &str = "docker_monitor";
pub const DEFAULT_URL: &str = "unix:///var/run/docker.sock";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,

    /// Prefix for every published sensor name.
    pub name: String,
    pub docker_url: String,

    pub scan_interval: Duration,
    pub poll_timeout: Duration,

    /// Catalog ids to publish.
    pub monitored_conditions: Vec<&'static str>,
    /// Containers to monitor; `None` means every container found at startup.
    pub containers: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server_host = lookup("WORKER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let server_port = lookup("WORKER_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8081);

        let name = lookup("DOCKER_MONITOR_NAME").unwrap_or_else(|| DEFAULT_NAME.to_string());

        let docker_url = lookup("DOCKER_URL")
            .or_else(|| lookup("DOCKER_HOST"))
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        // Intervals (in seconds)
        let scan_interval = seconds(&lookup, "SCAN_INTERVAL", 10)?;
        let poll_timeout = seconds(&lookup, "POLL_TIMEOUT", 10)?;

        let monitored_conditions = match lookup("MONITORED_CONDITIONS") {
            Some(raw) => split_list(&raw)
                .into_iter()
                .map(|id| {
                    catalog::descriptor(&id)
                        .map(|d| d.id)
                        .ok_or_else(|| anyhow!("Unknown monitored condition '{}'", id))
                })
                .collect::<Result<Vec<_>>>()?,
            None => catalog::all_ids(),
        };

        let containers = lookup("CONTAINERS").map(|raw| split_list(&raw));

        Ok(Self {
            server_host,
            server_port,
            name,
            docker_url,
            scan_interval,
            poll_timeout,
            monitored_conditions,
            containers,
        })
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| anyhow!("Invalid {} '{}': {}", key, raw, e))?,
        None => default,
    };
    if secs == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(Duration::from_secs(secs))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.name, "docker_monitor");
        assert_eq!(config.docker_url, DEFAULT_URL);
        assert_eq!(config.scan_interval, Duration::from_secs(10));
        assert_eq!(config.poll_timeout, Duration::from_secs(10));
        assert_eq!(config.monitored_conditions, catalog::all_ids());
        assert!(config.containers.is_none());
        assert_eq!(config.server_port, 8081);
    }

    #[test]
    fn docker_url_falls_back_to_docker_host() {
        let from_host = config(&[("DOCKER_HOST", "tcp://10.0.0.2:2375")]).unwrap();
        assert_eq!(from_host.docker_url, "tcp://10.0.0.2:2375");

        let explicit = config(&[("DOCKER_HOST", "tcp://a:1"), ("DOCKER_URL", "unix:///run/docker.sock")]);
        assert_eq!(explicit.unwrap().docker_url, "unix:///run/docker.sock");
    }

    #[test]
    fn lists_are_trimmed() {
        let config = config(&[
            ("CONTAINERS", "web, db ,,"),
            ("MONITORED_CONDITIONS", "container_status, container_cpu_percentage_usage"),
        ])
        .unwrap();
        assert_eq!(config.containers, Some(vec!["web".to_string(), "db".to_string()]));
        assert_eq!(
            config.monitored_conditions,
            vec!["container_status", "container_cpu_percentage_usage"]
        );
    }

    #[test]
    fn unknown_condition_is_rejected() {
        let err = config(&[("MONITORED_CONDITIONS", "container_disk")]).unwrap_err();
        assert!(err.to_string().contains("container_disk"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(config(&[("SCAN_INTERVAL", "0")]).is_err());
        assert!(config(&[("POLL_TIMEOUT", "soon")]).is_err());
    }
}
