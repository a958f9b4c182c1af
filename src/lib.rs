//! Link checker service.
//!
//! Accepts a URL over HTTP, submits it to a URL reputation scanning service,
//! polls for the report and classifies it into a safety verdict.
//!
//! # Features
//!
//! - **VirusTotal Integration** - Submit URLs and fetch reports from the v2 URL API
//! - **Fixed Polling** - Short, configurable wait schedule before each report query
//! - **Verdicts** - Safe, malicious, suspicious or pending, with per-category counts
//!
//! # Example Configuration
//!
//! ```yaml
//! settings:
//!   listen_address: "0.0.0.0:8000"
//!   route: "/check-url/"
//!
//! virustotal:
//!   api_key: "${VIRUSTOTAL_API_KEY}"
//!
//! polling:
//!   delays_ms: [200, 800]
//!
//! thresholds:
//!   safe_count: 5
//! ```

pub mod classifier;
pub mod config;
pub mod handler;
pub mod poller;
pub mod providers;
pub mod server;

pub use classifier::{classify, ClassificationResult, Status};
pub use config::Config;
pub use handler::LinkChecker;
