//! Classification of scan reports into a safety verdict.

use crate::providers::RawReport;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Default minimum number of clean verdicts for a safe rating.
pub const DEFAULT_SAFE_THRESHOLD: u64 = 5;

/// Result strings that count as a detection on their own.
const MALICIOUS_RESULTS: [&str; 2] = ["phishing site", "malicious"];

const CLEAN_RESULT: &str = "clean site";
const UNRATED_RESULT: &str = "unrated site";

/// Category key for scanners that returned no result string.
const NULL_RESULT_KEY: &str = "null";

/// Verdict assigned to a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Safe,
    Malicious,
    Suspicious,
    Pending,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Safe => "safe",
            Status::Malicious => "malicious",
            Status::Suspicious => "suspicious",
            Status::Pending => "pending",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category counts in presentation order, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Details(Vec<(String, u64)>);

impl Details {
    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, count)| *count)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.0.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn increment(&mut self, key: &str) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, count)) => *count += 1,
            None => self.0.push((key.to_string(), 1)),
        }
    }

    /// Push a trailing entry, replacing any catch-all category of the same name.
    fn append(&mut self, key: &str, count: u64) {
        self.0.retain(|(k, _)| k != key);
        self.0.push((key.to_string(), count));
    }
}

impl Serialize for Details {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Outcome of classifying a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub status: Status,
    pub message: String,
    pub permalink: String,
    pub details: Details,
}

/// Classify a report with the default threshold.
pub fn classify(report: &RawReport) -> ClassificationResult {
    classify_with_threshold(report, DEFAULT_SAFE_THRESHOLD)
}

/// Classify a report.
///
/// Any detection wins. Otherwise at least `safe_threshold` clean verdicts
/// rate the URL safe, and anything less is suspicious.
pub fn classify_with_threshold(report: &RawReport, safe_threshold: u64) -> ClassificationResult {
    let permalink = report.permalink.clone().unwrap_or_default();
    let total = report.scans.len() as u64;

    if total == 0 {
        return ClassificationResult {
            status: Status::Suspicious,
            message: "No scan data available.".to_string(),
            permalink,
            details: Details::default(),
        };
    }

    let mut details = Details::default();
    let mut safe = 0;
    let mut unrated = 0;

    for (_, verdict) in report.scans.iter() {
        let result = verdict.result.as_deref();

        if verdict.detected == Some(true) || result.is_some_and(|r| MALICIOUS_RESULTS.contains(&r)) {
            details.increment("malicious");
            continue;
        }

        match result {
            Some(CLEAN_RESULT) => safe += 1,
            Some(UNRATED_RESULT) => unrated += 1,
            Some(other) => details.increment(other),
            None => details.increment(NULL_RESULT_KEY),
        }
    }

    let malicious = details.get("malicious").unwrap_or(0);
    details.append("safe", safe);
    details.append("unrated", unrated);
    details.append("total", total);

    let (status, message) = if malicious > 0 {
        (
            Status::Malicious,
            format!("Link flagged by {} out of {} scanners.", malicious, total),
        )
    } else if safe >= safe_threshold {
        (
            Status::Safe,
            format!("{} out of {} scanners rated this link as clean.", safe, total),
        )
    } else {
        (
            Status::Suspicious,
            format!(
                "Only {} out of {} scanners rated this link as clean; below the threshold of {}.",
                safe, total, safe_threshold
            ),
        )
    };

    ClassificationResult {
        status,
        message,
        permalink,
        details,
    }
}
