use crate::banner::BannerCollector;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::prober::{self, Probe};
use crate::services;
use crate::types::{OpenPort, PortError, PortReport, ScanSummary, ScanTarget};
use ::time::{format_description::well_known, OffsetDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Scan every port of `target` and return the aggregated summary.
///
/// - Concurrency is `min(config.workers, ports in range)`, enforced with a `Semaphore`.
/// - Each port gets exactly one connect attempt bounded by `config.connect_timeout`.
/// - Open ports are labelled and banner-grabbed when `config.identify` is set.
pub async fn scan(target: &ScanTarget, config: &ScanConfig) -> Result<ScanSummary, ScanError> {
    scan_with_cancel(target, config, CancellationToken::new(), |_| {}).await
}

/// Variant that reports each port as soon as its task finishes and stops
/// dispatching new ports once `cancel` fires.
///
/// `on_report` sees ports in completion order, not numeric order. In-flight
/// probes are never aborted; they run to their own deadlines and their
/// sockets close when the owning task ends.
pub async fn scan_with_cancel<F>(
    target: &ScanTarget,
    config: &ScanConfig,
    cancel: CancellationToken,
    mut on_report: F,
) -> Result<ScanSummary, ScanError>
where
    F: FnMut(&PortReport),
{
    config.validate()?;

    let workers = config.effective_workers(&target.range);
    let started_at = now_rfc3339();
    let start = Instant::now();
    info!(
        host = %target.host,
        start = target.range.start(),
        end = target.range.end(),
        workers,
        "scan started"
    );

    let host: Arc<str> = Arc::from(target.host.as_str());
    let collector = config
        .identify
        .then(|| Arc::new(BannerCollector::new(config)));
    let connect_timeout = config.connect_timeout;

    let sem = Arc::new(Semaphore::new(workers));
    let mut set = JoinSet::new();
    let mut tally = Tally::default();
    let mut cancelled = false;

    for port in target.range.iter() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                cancelled = true;
                break;
            }
            permit = sem.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };

        while let Some(res) = set.try_join_next() {
            tally.absorb(res, &mut on_report);
        }

        let host = host.clone();
        let collector = collector.clone();
        set.spawn(async move {
            let _permit = permit; // keep permit until task completes
            probe_port(&host, port, connect_timeout, collector.as_deref()).await
        });
    }

    while let Some(res) = set.join_next().await {
        tally.absorb(res, &mut on_report);
    }

    let summary = tally.finish(target, workers, started_at, start.elapsed(), cancelled);
    info!(
        open = summary.open_ports.len(),
        scanned = summary.ports_scanned,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        cancelled,
        "scan finished"
    );
    Ok(summary)
}

/// One port, start to finish. The socket lives no longer than this call.
async fn probe_port(
    host: &str,
    port: u16,
    timeout: Duration,
    collector: Option<&BannerCollector>,
) -> PortReport {
    let Probe { result, stream } = prober::probe(host, port, timeout).await;
    let (service, banner) = match (stream, collector) {
        (Some(stream), Some(collector)) => {
            let service = services::identify(port);
            let banner = collector.collect(stream, host, port).await;
            (Some(service), Some(banner))
        }
        _ => (None, None),
    };
    PortReport {
        probe: result,
        service,
        banner,
    }
}

#[derive(Default)]
struct Tally {
    scanned: u64,
    open: Vec<OpenPort>,
    errors: Vec<PortError>,
}

impl Tally {
    fn absorb<F>(&mut self, res: Result<PortReport, JoinError>, on_report: &mut F)
    where
        F: FnMut(&PortReport),
    {
        let report = match res {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "probe task failed");
                return;
            }
        };
        self.scanned += 1;
        on_report(&report);

        if report.probe.open {
            self.open.push(OpenPort {
                port: report.port(),
                banner: report.banner_text().map(str::to_string),
                service: report.service,
            });
        } else if let Some(message) = report.probe.error {
            self.errors.push(PortError {
                port: report.probe.port,
                message,
            });
        }
    }

    fn finish(
        mut self,
        target: &ScanTarget,
        workers: usize,
        started_at: String,
        elapsed: Duration,
        cancelled: bool,
    ) -> ScanSummary {
        self.open.sort_by_key(|p| p.port);
        self.errors.sort_by_key(|e| e.port);
        ScanSummary {
            target_host: target.host.clone(),
            port_range_start: target.range.start(),
            port_range_end: target.range.end(),
            worker_count: workers,
            started_at,
            elapsed,
            ports_scanned: self.scanned,
            open_ports: self.open,
            errors: self.errors,
            cancelled,
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
