//! Scripted provider for tests.

use super::{ProviderError, RawReport, ScanProvider, REPORT_READY};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

/// Scripted outcome for a single report query.
pub enum Scripted {
    Report(RawReport),
    Fail(String),
}

pub struct MockScanProvider {
    submit_failure: Option<String>,
    reports: Mutex<VecDeque<Scripted>>,
    submit_count: AtomicUsize,
    report_times: Mutex<Vec<Instant>>,
}

impl Default for MockScanProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScanProvider {
    pub fn new() -> Self {
        Self {
            submit_failure: None,
            reports: Mutex::new(VecDeque::new()),
            submit_count: AtomicUsize::new(0),
            report_times: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_submit(message: &str) -> Self {
        let mut provider = Self::new();
        provider.submit_failure = Some(message.to_string());
        provider
    }

    pub fn with_report(self, report: RawReport) -> Self {
        self.reports.lock().unwrap().push_back(Scripted::Report(report));
        self
    }

    pub fn with_pending(self) -> Self {
        self.with_report(pending_report())
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.reports
            .lock()
            .unwrap()
            .push_back(Scripted::Fail(message.to_string()));
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::SeqCst)
    }

    pub fn report_count(&self) -> usize {
        self.report_times.lock().unwrap().len()
    }

    /// Instants at which each report query arrived.
    pub fn report_times(&self) -> Vec<Instant> {
        self.report_times.lock().unwrap().clone()
    }
}

/// A report the service has not finished yet.
pub fn pending_report() -> RawReport {
    RawReport {
        response_code: Some(-2),
        ..RawReport::default()
    }
}

/// A finished report from a JSON `scans` object.
pub fn ready_report(scans_json: &str) -> RawReport {
    let json = format!(
        r#"{{"response_code": {}, "permalink": "https://scanner.test/report/1", "scans": {}}}"#,
        REPORT_READY, scans_json
    );
    serde_json::from_str(&json).unwrap()
}

#[async_trait]
impl ScanProvider for MockScanProvider {
    async fn submit(&self, _url: &str) -> Result<serde_json::Value, ProviderError> {
        self.submit_count.fetch_add(1, Ordering::SeqCst);
        match &self.submit_failure {
            Some(message) => Err(ProviderError::Other(message.clone())),
            None => Ok(serde_json::json!({"response_code": 1})),
        }
    }

    async fn report(&self, _url: &str) -> Result<RawReport, ProviderError> {
        self.report_times.lock().unwrap().push(Instant::now());
        match self.reports.lock().unwrap().pop_front() {
            Some(Scripted::Report(report)) => Ok(report),
            Some(Scripted::Fail(message)) => Err(ProviderError::Other(message)),
            None => Ok(pending_report()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
