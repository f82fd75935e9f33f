use crate::error::ScanError;
use crate::types::PortRange;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 50;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_BANNER_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_BANNER_BYTES: usize = 1024;
pub const DEFAULT_USER_AGENT: &str = "SecureScan/1.0";
pub const DEFAULT_HTTP_PORTS: [u16; 4] = [80, 8000, 8008, 8080];
pub const DEFAULT_HTTPS_PORTS: [u16; 2] = [443, 8443];

/// Tunables for one scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Requested concurrency; capped at the number of ports in the range.
    pub workers: usize,
    pub connect_timeout: Duration,
    /// Deadline for the whole banner exchange, TLS handshake included.
    pub banner_timeout: Duration,
    /// Look up service labels and grab banners for open ports.
    pub identify: bool,
    /// Ports probed with a plaintext `GET /`.
    pub http_ports: Vec<u16>,
    /// Ports probed with `GET /` over TLS (certificate checks disabled).
    pub https_ports: Vec<u16>,
    pub banner_bytes: usize,
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            banner_timeout: Duration::from_millis(DEFAULT_BANNER_TIMEOUT_MS),
            identify: true,
            http_ports: DEFAULT_HTTP_PORTS.to_vec(),
            https_ports: DEFAULT_HTTPS_PORTS.to_vec(),
            banner_bytes: DEFAULT_BANNER_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ScanConfig {
    /// Reject settings that would make the scan meaningless.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.workers == 0 {
            return Err(ScanError::InvalidWorkerCount(self.workers));
        }
        if self.connect_timeout.is_zero() {
            return Err(ScanError::InvalidTimeout("connect"));
        }
        if self.banner_timeout.is_zero() {
            return Err(ScanError::InvalidTimeout("banner"));
        }
        Ok(())
    }

    /// Concurrency actually used for `range`: never more workers than ports.
    pub fn effective_workers(&self, range: &PortRange) -> usize {
        self.workers.min(range.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ScanConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.workers, 50);
        assert_eq!(cfg.banner_bytes, 1024);
        assert!(cfg.http_ports.contains(&80) && cfg.http_ports.contains(&8080));
        assert!(cfg.https_ports.contains(&443) && cfg.https_ports.contains(&8443));
    }

    #[test]
    fn zero_workers_rejected() {
        let cfg = ScanConfig { workers: 0, ..ScanConfig::default() };
        assert_eq!(cfg.validate(), Err(ScanError::InvalidWorkerCount(0)));
    }

    #[test]
    fn zero_timeout_rejected() {
        let cfg = ScanConfig { connect_timeout: Duration::ZERO, ..ScanConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn workers_capped_by_port_count() {
        let cfg = ScanConfig { workers: 200, ..ScanConfig::default() };
        let range = PortRange::new(1, 10).unwrap();
        assert_eq!(cfg.effective_workers(&range), 10);

        let cfg = ScanConfig { workers: 4, ..ScanConfig::default() };
        assert_eq!(cfg.effective_workers(&range), 4);
    }
}
