//! Link check request handling.

use crate::classifier::{classify_with_threshold, ClassificationResult, Status};
use crate::config::Config;
use crate::poller::ReportPoller;
use crate::providers::virustotal::VirusTotalProvider;
use crate::providers::{ProviderError, ScanProvider};
use hyper::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Host;

/// URL schemes accepted for scanning.
const ALLOWED_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

const PENDING_MESSAGE: &str = "Scan is still pending; please try again later.";

/// Errors that end a check before a verdict is reached.
#[derive(Debug)]
pub enum HandlerError {
    /// Body is not valid JSON.
    MalformedBody,
    /// No URL in the request.
    MissingUrl,
    /// URL failed well-formedness checks.
    InvalidUrl,
    /// Submitting the scan failed.
    Submit(ProviderError),
    /// Fetching the report failed.
    Poll(ProviderError),
}

impl HandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::MalformedBody | HandlerError::MissingUrl | HandlerError::InvalidUrl => {
                StatusCode::BAD_REQUEST
            }
            HandlerError::Submit(_) | HandlerError::Poll(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::MalformedBody => write!(f, "Malformed JSON body"),
            HandlerError::MissingUrl => write!(f, "URL is required"),
            HandlerError::InvalidUrl => write!(f, "Invalid URL provided"),
            HandlerError::Submit(e) | HandlerError::Poll(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for HandlerError {}

/// Status code and serialized JSON body for a check.
#[derive(Debug, Clone)]
pub struct CheckResponse {
    pub status: StatusCode,
    pub body: String,
}

impl CheckResponse {
    fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        // Plain structs and string maps always serialize.
        let body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
        Self { status, body }
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    fn pending() -> Self {
        Self::json(
            StatusCode::ACCEPTED,
            &serde_json::json!({
                "status": Status::Pending,
                "message": PENDING_MESSAGE,
            }),
        )
    }
}

impl From<HandlerError> for CheckResponse {
    fn from(e: HandlerError) -> Self {
        CheckResponse::error(e.status_code(), &e.to_string())
    }
}

/// Link checker: validates, submits, polls and classifies.
pub struct LinkChecker {
    config: Arc<Config>,
    provider: Box<dyn ScanProvider>,
    poller: ReportPoller,
}

impl LinkChecker {
    /// Create a link checker backed by VirusTotal.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let provider = VirusTotalProvider::new(config.virustotal.clone())?;
        Ok(Self::with_provider(config, Box::new(provider)))
    }

    /// Create a link checker with a specific provider.
    pub fn with_provider(config: Config, provider: Box<dyn ScanProvider>) -> Self {
        let poller = ReportPoller::new(config.polling.delays());

        info!(
            provider = provider.name(),
            route = %config.settings.route,
            poll_attempts = poller.delays().len(),
            safe_threshold = config.thresholds.safe_count,
            "Link checker initialized"
        );

        Self {
            config: Arc::new(config),
            provider,
            poller,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle a raw request body.
    pub async fn handle_body(&self, body: &[u8]) -> CheckResponse {
        match self.check(body).await {
            Ok(Some(result)) => CheckResponse::json(StatusCode::OK, &result),
            Ok(None) => CheckResponse::pending(),
            Err(e) => {
                match &e {
                    HandlerError::Submit(err) | HandlerError::Poll(err) => {
                        warn!(error = %err, "Scanning service request failed");
                    }
                    _ => debug!(error = %e, "Rejected link check request"),
                }
                e.into()
            }
        }
    }

    /// Run a full check. `Ok(None)` means the report is still pending.
    pub async fn check(&self, body: &[u8]) -> Result<Option<ClassificationResult>, HandlerError> {
        let url = extract_url(body)?;
        if !is_valid_url(&url) {
            return Err(HandlerError::InvalidUrl);
        }

        self.provider
            .submit(&url)
            .await
            .map_err(HandlerError::Submit)?;

        let report = match self
            .poller
            .poll(self.provider.as_ref(), &url)
            .await
            .map_err(HandlerError::Poll)?
        {
            Some(report) => report,
            None => {
                debug!(url = %url, "Report still pending");
                return Ok(None);
            }
        };

        let result = classify_with_threshold(&report, self.config.thresholds.safe_count);

        if self.config.settings.log_requests {
            info!(
                url = %url,
                status = %result.status,
                scanners = report.scans.len(),
                "Link classified"
            );
        }

        Ok(Some(result))
    }
}

/// Pull the `url` field out of a JSON request body.
fn extract_url(body: &[u8]) -> Result<String, HandlerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(HandlerError::MissingUrl);
    }

    let value: Value = serde_json::from_slice(body).map_err(|_| HandlerError::MalformedBody)?;
    let url = match value.get("url") {
        Some(url) if !is_blank(url) => url,
        _ => return Err(HandlerError::MissingUrl),
    };

    url.as_str()
        .map(str::to_string)
        .ok_or(HandlerError::InvalidUrl)
}

/// Null, empty, false and zero values count as no URL.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Absolute URL with an allowed scheme and a host.
pub fn is_valid_url(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }

    match url::Url::parse(candidate) {
        Ok(parsed) => ALLOWED_SCHEMES.contains(&parsed.scheme()) && is_valid_host(parsed.host()),
        Err(_) => false,
    }
}

/// IP literals, `localhost`, or a dotted domain name.
fn is_valid_host(host: Option<Host<&str>>) -> bool {
    match host {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        Some(Host::Domain(domain)) => {
            // A single trailing dot marks a fully qualified name.
            let domain = domain.strip_suffix('.').unwrap_or(domain);
            domain == "localhost"
                || (domain.contains('.') && domain.split('.').all(|label| !label.is_empty()))
        }
        None => false,
    }
}
