//! Domain types for one probe run.
//!
//! All of these are plain values created and consumed within a single run;
//! only `RunReport` survives, as serialized artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One URL to be health-checked, plus its derived registrable hostname.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Target {
    pub url: String,
    /// Lowercased, `www.`-stripped host; empty when the URL does not parse,
    /// which disables hostname-based classification rules for this target.
    pub host: String,
}

impl Target {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let host = registrable_host(&url);
        Self { url, host }
    }
}

/// Derive the registrable hostname used for redirect-host matching.
pub fn registrable_host(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => {
                let host = host.to_ascii_lowercase();
                // Exactly one leading "www." label comes off.
                host.strip_prefix("www.").unwrap_or(&host).to_string()
            }
            None => String::new(),
        },
        Err(_) => String::new(),
    }
}

/// Raw signals captured from one navigation attempt. Never mutated.
#[derive(Clone, Debug, Default)]
pub struct Observation {
    /// HTTP-like status of the main document; 0 when unavailable.
    pub status: u16,
    /// Registrable hostname actually reached after redirects.
    pub final_host: String,
    /// Character count of the visible document body.
    pub text_len: usize,
    pub title: String,
    /// Raw markup length of the rendered document.
    pub markup_len: usize,
}

/// Boolean health classification plus a diagnostic for negative verdicts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    pub fn fail(reason: String) -> Self {
        Self {
            passed: false,
            reason: Some(reason),
        }
    }
}

/// The persisted per-target result for a run.
///
/// Invariants: `1 <= attempts <= max_attempts`; `error` is non-empty iff
/// `success` is false.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VisitOutcome {
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub status: u16,
    pub success: bool,
    pub attempts: u32,
    pub error: String,
}

/// Ordered per-target outcomes for one execution, in source order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub started: DateTime<Utc>,
    pub outcomes: Vec<VisitOutcome>,
}

impl RunReport {
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }
}
