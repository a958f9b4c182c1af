//! URL reputation scanning providers.

#[cfg(test)]
pub mod mock;
pub mod virustotal;

use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Report `response_code` value meaning the scan has finished.
pub const REPORT_READY: i64 = 1;

/// Raw report returned by the scanning service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReport {
    /// 1 when the report is ready; anything else means queued or unknown.
    #[serde(default)]
    pub response_code: Option<i64>,

    /// Per-scanner verdicts, in the order the service listed them.
    #[serde(default)]
    pub scans: ScanSet,

    /// Number of scanners that flagged the URL.
    #[serde(default)]
    pub positives: Option<u64>,

    /// Number of scanners consulted.
    #[serde(default)]
    pub total: Option<u64>,

    /// Link to the human-readable report.
    #[serde(default)]
    pub permalink: Option<String>,
}

impl RawReport {
    /// Whether the service has finished scanning.
    pub fn is_ready(&self) -> bool {
        self.response_code == Some(REPORT_READY)
    }
}

/// A single scanner's verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScanVerdict {
    #[serde(default)]
    pub detected: Option<bool>,
    #[serde(default)]
    pub result: Option<String>,
}

impl ScanVerdict {
    pub fn detected() -> Self {
        Self {
            detected: Some(true),
            result: None,
        }
    }

    pub fn with_result(result: &str) -> Self {
        Self {
            detected: Some(false),
            result: Some(result.to_string()),
        }
    }
}

/// Scanner name to verdict mapping that keeps document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSet(Vec<(String, ScanVerdict)>);

impl ScanSet {
    pub fn push(&mut self, scanner: &str, verdict: ScanVerdict) {
        self.0.push((scanner.to_string(), verdict));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScanVerdict)> {
        self.0.iter().map(|(name, verdict)| (name.as_str(), verdict))
    }
}

impl FromIterator<(String, ScanVerdict)> for ScanSet {
    fn from_iter<I: IntoIterator<Item = (String, ScanVerdict)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for ScanSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScanSetVisitor;

        impl<'de> Visitor<'de> for ScanSetVisitor {
            type Value = ScanSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of scanner names to verdicts")
            }

            fn visit_map<M>(self, mut map: M) -> Result<ScanSet, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut scans = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, verdict)) = map.next_entry::<String, ScanVerdict>()? {
                    scans.push((name, verdict));
                }
                Ok(ScanSet(scans))
            }

            fn visit_unit<E>(self) -> Result<ScanSet, E> {
                Ok(ScanSet::default())
            }
        }

        deserializer.deserialize_any(ScanSetVisitor)
    }
}

/// Error from a scanning provider.
#[derive(Debug)]
pub enum ProviderError {
    /// HTTP request failed or returned a non-success status.
    Http(reqwest::Error),
    /// Timeout.
    Timeout(reqwest::Error),
    /// Rate limited.
    RateLimited,
    /// Invalid response.
    InvalidResponse(String),
    /// Other error.
    Other(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Http(e) | ProviderError::Timeout(e) => write!(f, "{}", e),
            ProviderError::RateLimited => write!(f, "Rate limited by scanning service"),
            ProviderError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ProviderError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // The report URL carries the API key in its query string.
        let e = e.without_url();
        if e.is_timeout() {
            ProviderError::Timeout(e)
        } else {
            ProviderError::Http(e)
        }
    }
}

/// Trait for URL scanning providers.
#[async_trait]
pub trait ScanProvider: Send + Sync {
    /// Submit a URL for scanning and return the acknowledgment body.
    async fn submit(&self, url: &str) -> Result<serde_json::Value, ProviderError>;

    /// Fetch the current report for a URL.
    async fn report(&self, url: &str) -> Result<RawReport, ProviderError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
