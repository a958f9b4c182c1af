//! Configuration types for the link checker.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Global settings.
    #[serde(default)]
    pub settings: Settings,

    /// VirusTotal provider configuration.
    pub virustotal: VirusTotalConfig,

    /// Report polling schedule.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Classification thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,
}

/// Global settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Path of the check endpoint.
    #[serde(default = "default_route")]
    pub route: String,

    /// Log every classified request at info level.
    #[serde(default = "default_true")]
    pub log_requests: bool,

    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            route: default_route(),
            log_requests: true,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_route() -> String {
    "/check-url/".to_string()
}

fn default_max_body_bytes() -> usize {
    2_621_440
}

/// VirusTotal provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirusTotalConfig {
    /// API key (supports ${ENV_VAR} syntax).
    pub api_key: String,

    /// Base URL of the v2 API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "https://www.virustotal.com/vtapi/v2".to_string()
}

fn default_timeout() -> u64 {
    10000
}

/// Report polling schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    /// Wait before each report query, in milliseconds.
    #[serde(default = "default_delays")]
    pub delays_ms: Vec<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            delays_ms: default_delays(),
        }
    }
}

impl PollingConfig {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays_ms.iter().map(|ms| Duration::from_millis(*ms)).collect()
    }
}

fn default_delays() -> Vec<u64> {
    vec![200, 800]
}

/// Classification thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Thresholds {
    /// Minimum number of "clean site" verdicts for a safe rating.
    #[serde(default = "default_safe_count")]
    pub safe_count: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            safe_count: default_safe_count(),
        }
    }
}

fn default_safe_count() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.virustotal.api_key.is_empty() {
            anyhow::bail!("virustotal.api_key is empty");
        }

        if url::Url::parse(&self.virustotal.base_url).is_err() {
            anyhow::bail!("Invalid virustotal.base_url: {}", self.virustotal.base_url);
        }

        if self.listen_addr().is_err() {
            anyhow::bail!("Invalid listen_address: {}", self.settings.listen_address);
        }

        if !self.settings.route.starts_with('/') {
            anyhow::bail!("route must start with '/': {}", self.settings.route);
        }

        if self.settings.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be at least 1");
        }

        if self.polling.delays_ms.is_empty() {
            anyhow::bail!("polling.delays_ms must contain at least one delay");
        }

        if self.thresholds.safe_count == 0 {
            anyhow::bail!("thresholds.safe_count must be at least 1");
        }

        Ok(())
    }

    /// Parsed listen address.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.settings.listen_address.parse()?)
    }

    /// Generate example configuration YAML.
    pub fn example() -> String {
        r#"# Link Checker Configuration

settings:
  listen_address: "0.0.0.0:8000"
  route: "/check-url/"         # POST endpoint path
  log_requests: true
  max_body_bytes: 2621440      # Larger request bodies get 413

# VirusTotal URL scanning (v2 API)
virustotal:
  api_key: "${VIRUSTOTAL_API_KEY}"  # Use environment variable
  base_url: "https://www.virustotal.com/vtapi/v2"
  timeout_ms: 10000            # API timeout

# Wait before each report query (milliseconds)
polling:
  delays_ms: [200, 800]

# Minimum "clean site" verdicts for a safe rating
thresholds:
  safe_count: 5
"#
        .to_string()
    }
}

/// Expand environment variables in the format ${VAR_NAME}.
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

    for cap in re.captures_iter(content) {
        let var_value = std::env::var(&cap[1]).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
