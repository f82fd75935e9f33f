use std::path::PathBuf;
use std::time::Duration;

use securescan::config::{self, ScanConfig};
use securescan::types::ScanTarget;
use securescan::{ports, report, scanner};

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// securescan — TCP connect port scanner with service labels and banner grabbing.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "securescan",
    version,
    about = "TCP connect port scanner with service labels and best-effort banner grabbing.",
    long_about = None
)]
struct Cli {
    /// Target host name or IP address.
    #[arg(long)]
    target: String,

    /// Inclusive port range, e.g. 20-100 (a single port is also accepted).
    #[arg(long, default_value = "1-1024")]
    ports: String,

    /// Max concurrent probes; capped at the number of ports in the range.
    #[arg(long, default_value_t = config::DEFAULT_WORKERS)]
    workers: usize,

    /// Connect timeout per port in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = config::DEFAULT_CONNECT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Banner grab timeout per open port in milliseconds.
    #[arg(long = "banner-timeout-ms", default_value_t = config::DEFAULT_BANNER_TIMEOUT_MS)]
    banner_timeout_ms: u64,

    /// Skip service labels and banner grabbing; only report open ports.
    #[arg(long = "no-identify", default_value_t = false)]
    no_identify: bool,

    /// Ports probed with a plaintext HTTP request (comma separated).
    #[arg(long = "http-ports", value_delimiter = ',', default_values_t = config::DEFAULT_HTTP_PORTS)]
    http_ports: Vec<u16>,

    /// Ports probed with HTTP over TLS, certificates unverified (comma separated).
    #[arg(long = "https-ports", value_delimiter = ',', default_values_t = config::DEFAULT_HTTPS_PORTS)]
    https_ports: Vec<u16>,

    /// Write the scan summary as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Enable debug logging on stderr (overrides RUST_LOG).
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            workers: self.workers,
            connect_timeout: Duration::from_millis(self.timeout_ms),
            banner_timeout: Duration::from_millis(self.banner_timeout_ms),
            identify: !self.no_identify,
            http_ports: self.http_ports.clone(),
            https_ports: self.https_ports.clone(),
            ..ScanConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // All input validation happens here, before any socket is opened.
    let range = ports::parse_port_range(&cli.ports)?;
    let target = ScanTarget::new(&cli.target, range)?;
    let config = cli.scan_config();
    config.validate()?;

    println!(
        "\nScanning {} ports {}-{} with {} workers...\n",
        target.host,
        range.start(),
        range.end(),
        config.effective_workers(&range)
    );

    // Ctrl-C stops dispatching new ports; in-flight probes drain and the summary still prints.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    let summary = scanner::scan_with_cancel(&target, &config, cancel, |r| {
        if let Some(line) = report::port_line(r) {
            println!("{line}");
        }
    })
    .await?;

    print!("{}", report::summary_block(&summary));

    if let Some(path) = cli.output.as_deref() {
        if let Err(e) = report::write_summary_json(path, &summary) {
            eprintln!("Failed to write JSON to {}: {:#}", path.display(), e);
        } else {
            println!("Wrote JSON results to {}", path.display());
        }
    }

    Ok(())
}
