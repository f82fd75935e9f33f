//! Library crate for securescan: TCP connect scanning with service labels and banner grabbing.
pub mod banner;
pub mod config;
pub mod error;
pub mod ports;
pub mod prober;
pub mod report;
pub mod scanner;
pub mod services;
pub mod types;

pub use config::ScanConfig;
pub use error::ScanError;
pub use scanner::{scan, scan_with_cancel};
pub use types::{PortRange, PortReport, ScanSummary, ScanTarget};
