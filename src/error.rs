use thiserror::Error;

/// Input validation failures. These are the only errors that abort a scan,
/// and they are always raised before any socket is opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("invalid port range: {0}")]
    InvalidPortRange(String),

    #[error("invalid target host: {0:?}")]
    InvalidHost(String),

    #[error("worker count must be at least 1 (got {0})")]
    InvalidWorkerCount(usize),

    #[error("{0} timeout must be greater than zero")]
    InvalidTimeout(&'static str),
}
