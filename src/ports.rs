use crate::error::ScanError;
use crate::types::PortRange;

/// Parse a port range argument into an inclusive [`PortRange`].
///
/// Supported formats:
/// - inclusive range: `20-100`
/// - single port: `80` (same as `80-80`)
///
/// Whitespace around either bound is ignored. Bounds must be decimal and
/// within 0..=65535, and `start` must not exceed `end`.
pub fn parse_port_range(s: &str) -> Result<PortRange, ScanError> {
    let line = s.trim();
    if line.is_empty() {
        return Err(ScanError::InvalidPortRange("empty port range".into()));
    }

    let (start, end) = match line.split_once('-') {
        Some((a, b)) => (
            parse_port_str(a.trim()).map_err(|e| range_err(line, "start", &e))?,
            parse_port_str(b.trim()).map_err(|e| range_err(line, "end", &e))?,
        ),
        None => {
            let p = parse_port_str(line).map_err(|e| range_err(line, "port", &e))?;
            (p, p)
        }
    };

    PortRange::new(start, end).ok_or_else(|| {
        ScanError::InvalidPortRange(format!("{start}-{end} (start > end)"))
    })
}

fn range_err(input: &str, which: &str, reason: &str) -> ScanError {
    ScanError::InvalidPortRange(format!("{input}: invalid {which}: {reason}"))
}

fn parse_port_str(s: &str) -> Result<u16, String> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("not a decimal number: {s:?}"));
    }
    let val: u32 = s.parse().map_err(|_| format!("port out of range: {s}"))?;
    u16::try_from(val).map_err(|_| format!("port out of range: {val}"))
}
