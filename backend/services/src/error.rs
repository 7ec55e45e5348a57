use thiserror::Error;

/// Failures surfaced by the monitoring services. Raw bollard errors are
/// translated into one of these before they leave the crate.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No transport is available for the configured daemon address.
    #[error("docker transport unavailable for '{0}'")]
    Unavailable(String),

    #[error("cannot connect to docker at '{address}': {reason}")]
    Connection { address: String, reason: String },

    #[error("container '{0}' not found")]
    NotFound(String),

    #[error("error communicating with docker API: {0}")]
    Fetch(String),
}

impl MonitorError {
    /// Collapses any error into the single per-poll failure signal.
    pub fn into_fetch(self) -> Self {
        match self {
            Self::Fetch(_) => self,
            other => Self::Fetch(other.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
