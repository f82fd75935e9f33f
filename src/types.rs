use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Inclusive TCP port range. Always `start <= end`, including when deserialized.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "RawPortRange")]
pub struct PortRange {
    start: u16,
    end: u16,
}

#[derive(Deserialize)]
struct RawPortRange {
    start: u16,
    end: u16,
}

impl TryFrom<RawPortRange> for PortRange {
    type Error = String;

    fn try_from(raw: RawPortRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
            .ok_or_else(|| format!("invalid port range {}-{} (start > end)", raw.start, raw.end))
    }
}

impl PortRange {
    /// Build a range, returning `None` when `start > end`.
    pub fn new(start: u16, end: u16) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    /// Number of ports in the range (1..=65536).
    pub fn len(&self) -> usize {
        usize::from(self.end) - usize::from(self.start) + 1
    }

    /// A valid range is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Ports in ascending order.
    pub fn iter(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }
}

/// Host plus port range to scan. Only built through [`ScanTarget::new`].
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub host: String,
    pub range: PortRange,
}

impl ScanTarget {
    /// Validate the host syntactically. Name resolution happens per probe,
    /// so an unresolvable name is not an error here, only a closed port later.
    pub fn new(host: &str, range: PortRange) -> Result<Self, ScanError> {
        let trimmed = host.trim();
        // `[::1]` style literals are accepted and unwrapped.
        let host = trimmed
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(trimmed);
        let bad_char = |c: char| c.is_whitespace() || c.is_control() || matches!(c, '/' | '@' | '?' | '#');
        if host.is_empty() || host.len() > 253 || host.chars().any(bad_char) {
            return Err(ScanError::InvalidHost(trimmed.to_string()));
        }
        if host.contains(':') && host.parse::<Ipv6Addr>().is_err() {
            return Err(ScanError::InvalidHost(trimmed.to_string()));
        }
        Ok(Self {
            host: host.to_string(),
            range,
        })
    }
}

/// Outcome of one connection attempt.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub port: u16,
    pub open: bool,
    /// Set only for unexpected local I/O failures; refused/filtered ports carry `None`.
    pub error: Option<String>,
}

/// Well-known service label for a port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub port: u16,
    pub label: String,
}

/// Banner text captured from an open port. `None` is a normal outcome.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BannerResult {
    pub port: u16,
    pub text: Option<String>,
}

impl BannerResult {
    pub fn empty(port: u16) -> Self {
        Self { port, text: None }
    }
}

/// Everything learned about one port during a scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortReport {
    pub probe: ProbeResult,
    pub service: Option<ServiceInfo>,
    pub banner: Option<BannerResult>,
}

impl PortReport {
    pub fn port(&self) -> u16 {
        self.probe.port
    }

    /// Banner text, if one was captured and is non-empty.
    pub fn banner_text(&self) -> Option<&str> {
        self.banner.as_ref().and_then(|b| b.text.as_deref())
    }
}

/// An open port as recorded in the final summary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenPort {
    pub port: u16,
    pub service: Option<ServiceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

/// A port whose probe hit an unexpected local I/O error.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortError {
    pub port: u16,
    pub message: String,
}

/// Aggregate results of a finished (or cancelled) scan.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScanSummary {
    pub target_host: String,
    pub port_range_start: u16,
    pub port_range_end: u16,
    pub worker_count: usize,
    pub started_at: String,
    pub elapsed: Duration,
    pub ports_scanned: u64,
    pub open_ports: Vec<OpenPort>,
    pub errors: Vec<PortError>,
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_len_is_inclusive() {
        let r = PortRange::new(20, 25).unwrap();
        assert_eq!(r.len(), 6);
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![20, 21, 22, 23, 24, 25]);
        assert_eq!(PortRange::new(0, 65535).unwrap().len(), 65536);
    }

    #[test]
    fn reversed_range_rejected() {
        assert!(PortRange::new(100, 50).is_none());
    }

    #[test]
    fn deserialized_range_is_validated() {
        let ok: PortRange = serde_json::from_str(r#"{"start":20,"end":25}"#).unwrap();
        assert_eq!(ok.len(), 6);
        let err = serde_json::from_str::<PortRange>(r#"{"start":100,"end":50}"#).unwrap_err();
        assert!(err.to_string().contains("start > end"));
    }

    #[test]
    fn target_accepts_names_and_literals() {
        let r = PortRange::new(80, 80).unwrap();
        assert_eq!(ScanTarget::new(" example.com ", r).unwrap().host, "example.com");
        assert_eq!(ScanTarget::new("10.0.0.1", r).unwrap().host, "10.0.0.1");
        assert_eq!(ScanTarget::new("[::1]", r).unwrap().host, "::1");
    }

    #[test]
    fn target_rejects_malformed_hosts() {
        let r = PortRange::new(80, 80).unwrap();
        for bad in ["", "   ", "exa mple.com", "http://x", "1:2:3", "host:80"] {
            assert!(
                matches!(ScanTarget::new(bad, r), Err(ScanError::InvalidHost(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
