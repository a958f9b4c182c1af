//! VirusTotal URL scanning provider (v2 API).

use super::{ProviderError, RawReport, ScanProvider};
use crate::config::VirusTotalConfig;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// VirusTotal scanning provider.
pub struct VirusTotalProvider {
    config: VirusTotalConfig,
    client: Client,
}

impl VirusTotalProvider {
    /// Create a new VirusTotal provider.
    pub fn new(config: VirusTotalConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ProviderError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn scan_endpoint(&self) -> String {
        self.endpoint("url/scan")
    }

    fn report_endpoint(&self) -> String {
        self.endpoint("url/report")
    }

    /// Reject rate limiting and non-success statuses.
    fn check_status(&self, response: Response) -> Result<Response, ProviderError> {
        // v2 signals an exhausted quota with an empty 204.
        if matches!(
            response.status(),
            StatusCode::NO_CONTENT | StatusCode::TOO_MANY_REQUESTS
        ) {
            warn!("VirusTotal rate limit exceeded");
            return Err(ProviderError::RateLimited);
        }

        Ok(response.error_for_status()?)
    }
}

#[async_trait]
impl ScanProvider for VirusTotalProvider {
    async fn submit(&self, url: &str) -> Result<serde_json::Value, ProviderError> {
        debug!(url = %url, "Submitting URL to VirusTotal");

        let response = self
            .client
            .post(self.scan_endpoint())
            .form(&[("apikey", self.config.api_key.as_str()), ("url", url)])
            .send()
            .await?;

        let response = self.check_status(response)?;
        let ack = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse scan acknowledgment: {}", e))
        })?;

        debug!(url = %url, "VirusTotal accepted scan");
        Ok(ack)
    }

    async fn report(&self, url: &str) -> Result<RawReport, ProviderError> {
        debug!(url = %url, "Querying VirusTotal report");

        let response = self
            .client
            .get(self.report_endpoint())
            .query(&[("apikey", self.config.api_key.as_str()), ("resource", url)])
            .send()
            .await?;

        let response = self.check_status(response)?;
        let report: RawReport = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse report: {}", e))
        })?;

        debug!(
            url = %url,
            response_code = ?report.response_code,
            positives = ?report.positives,
            total = ?report.total,
            scanners = report.scans.len(),
            "VirusTotal report received"
        );

        Ok(report)
    }

    fn name(&self) -> &str {
        "virustotal"
    }
}
