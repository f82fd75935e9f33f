use crate::types::{PortReport, ScanSummary};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

/// Longest banner shown on a result line; JSON output keeps the full text.
const BANNER_DISPLAY_MAX: usize = 120;

/// Line printed for one port as soon as its probe completes, or `None` for
/// a plain closed port.
pub fn port_line(report: &PortReport) -> Option<String> {
    let probe = &report.probe;
    if let Some(err) = &probe.error {
        return Some(format!("[-] Error scanning port {}: {}", probe.port, err));
    }
    if !probe.open {
        return None;
    }

    let mut line = format!("[+] Port {}/tcp open", probe.port);
    if let Some(service) = &report.service {
        line.push_str(&format!("  {}", service.label));
    }
    if let Some(banner) = report.banner_text() {
        line.push_str(&format!("  | {}", display_banner(banner)));
    }
    Some(line)
}

/// End-of-scan block: duration, target, range, worker count.
pub fn summary_block(summary: &ScanSummary) -> String {
    let mut out = String::new();
    out.push_str("\nScan summary:\n");
    out.push_str(&format!(
        "  duration     : {:.2}s\n",
        summary.elapsed.as_secs_f64()
    ));
    out.push_str(&format!("  target       : {}\n", summary.target_host));
    out.push_str(&format!(
        "  port range   : {}-{}\n",
        summary.port_range_start, summary.port_range_end
    ));
    out.push_str(&format!("  workers      : {}\n", summary.worker_count));
    out.push_str(&format!(
        "  open ports   : {} (scanned: {})\n",
        summary.open_ports.len(),
        summary.ports_scanned
    ));
    if !summary.errors.is_empty() {
        out.push_str(&format!("  errors       : {}\n", summary.errors.len()));
    }
    if summary.cancelled {
        out.push_str("  status       : cancelled before completion\n");
    }
    out
}

pub fn write_summary_json(path: &Path, summary: &ScanSummary) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output file: {}", path.display()))?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

/// Flatten line breaks and cap the length so a banner fits on one line.
fn display_banner(banner: &str) -> String {
    let flat = banner.replace('\r', "\\r").replace('\n', "\\n");
    match flat.char_indices().nth(BANNER_DISPLAY_MAX) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}
