//! Fixed-schedule polling for scan reports.

use crate::providers::{ProviderError, RawReport, ScanProvider};
use std::time::Duration;
use tracing::debug;

/// Polls a provider for a finished report on a fixed schedule.
#[derive(Debug, Clone)]
pub struct ReportPoller {
    delays: Vec<Duration>,
}

impl Default for ReportPoller {
    /// Wait 200ms, query, then wait another 800ms and query again.
    fn default() -> Self {
        Self::new(vec![Duration::from_millis(200), Duration::from_millis(800)])
    }
}

impl ReportPoller {
    /// Create a poller that sleeps for each delay in order before querying.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Poll until a ready report arrives or the schedule runs out.
    ///
    /// Returns `Ok(None)` when every attempt came back not ready. A transport
    /// error aborts immediately and is not retried.
    pub async fn poll(
        &self,
        provider: &dyn ScanProvider,
        url: &str,
    ) -> Result<Option<RawReport>, ProviderError> {
        for (attempt, delay) in self.delays.iter().enumerate() {
            tokio::time::sleep(*delay).await;

            let report = provider.report(url).await?;
            if report.is_ready() {
                debug!(
                    url = %url,
                    attempt = attempt + 1,
                    provider = provider.name(),
                    "Report ready"
                );
                return Ok(Some(report));
            }

            debug!(
                url = %url,
                attempt = attempt + 1,
                response_code = ?report.response_code,
                "Report not ready"
            );
        }

        Ok(None)
    }
}
