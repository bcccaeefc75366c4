//! Bounded per-target retry loop with exponential backoff and jitter.
//!
//! A navigation fault is consumed here as a failed attempt; it never escapes
//! to the visit engine. After the loop, win or lose, a randomized inter-visit
//! pause paces the whole run so it does not present as an automated burst.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use browser_adapter::{BrowserSession, NavigationOutcome};

use crate::classify::Classifier;
use crate::types::{registrable_host, Observation, Target, VisitOutcome};

/// Seam for every cooperative wait so tests run without wall-clock sleeps.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn sleep(&self, wait: Duration);
}

pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn sleep(&self, wait: Duration) {
        tokio::time::sleep(wait).await;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "RetryPolicy::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "RetryPolicy::default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "RetryPolicy::default_jitter_ceiling_ms")]
    pub jitter_ceiling_ms: u64,
    #[serde(default = "RetryPolicy::default_min_visit_gap_ms")]
    pub min_visit_gap_ms: u64,
    #[serde(default = "RetryPolicy::default_max_visit_gap_ms")]
    pub max_visit_gap_ms: u64,
    #[serde(default = "RetryPolicy::default_nav_timeout_ms")]
    pub nav_timeout_ms: u64,
}

impl RetryPolicy {
    fn default_max_attempts() -> u32 {
        3
    }

    fn default_base_backoff_ms() -> u64 {
        2_000
    }

    fn default_jitter_ceiling_ms() -> u64 {
        1_000
    }

    fn default_min_visit_gap_ms() -> u64 {
        3_000
    }

    fn default_max_visit_gap_ms() -> u64 {
        8_000
    }

    fn default_nav_timeout_ms() -> u64 {
        45_000
    }

    /// `base * 2^(attempt-1)` plus additive uniform jitter. Attempt is
    /// 1-based; jitter is never negative, so the geometric floor holds.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let floor = self.base_backoff_ms.saturating_mul(1u64 << shift);
        let jitter = if self.jitter_ceiling_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..self.jitter_ceiling_ms)
        };
        Duration::from_millis(floor.saturating_add(jitter))
    }

    /// Randomized pause between visits, independent of retry backoff.
    pub fn visit_gap(&self) -> Duration {
        let min = self.min_visit_gap_ms.min(self.max_visit_gap_ms);
        let max = self.max_visit_gap_ms.max(self.min_visit_gap_ms);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            base_backoff_ms: Self::default_base_backoff_ms(),
            jitter_ceiling_ms: Self::default_jitter_ceiling_ms(),
            min_visit_gap_ms: Self::default_min_visit_gap_ms(),
            max_visit_gap_ms: Self::default_max_visit_gap_ms(),
            nav_timeout_ms: Self::default_nav_timeout_ms(),
        }
    }
}

/// Script that snapshots the DOM signals the classifier reads.
const PAGE_PROBE: &str = r#"({
    title: document.title || "",
    textLen: (document.body && document.body.innerText) ? document.body.innerText.length : 0,
    markupLen: document.documentElement ? document.documentElement.outerHTML.length : 0
})"#;

/// Build an observation from a finished navigation. DOM probing is best
/// effort: a failed evaluation leaves the DOM fields at zero rather than
/// failing the attempt, since the network signals may still classify.
pub async fn collect_observation(
    session: &dyn BrowserSession,
    navigation: NavigationOutcome,
) -> Observation {
    let mut observation = Observation {
        status: navigation.status,
        final_host: registrable_host(&navigation.final_url),
        ..Default::default()
    };

    match session.evaluate(PAGE_PROBE).await {
        Ok(snapshot) => {
            observation.title = snapshot
                .get("title")
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string();
            observation.text_len = snapshot
                .get("textLen")
                .and_then(|value| value.as_u64())
                .unwrap_or(0) as usize;
            observation.markup_len = snapshot
                .get("markupLen")
                .and_then(|value| value.as_u64())
                .unwrap_or(0) as usize;
        }
        Err(err) => {
            debug!(target: "sitewatch", %err, "page probe failed, keeping network signals only");
        }
    }

    observation
}

/// Visit one target with bounded retries. Always returns an outcome; faults
/// are folded into it.
pub async fn attempt_visit(
    target: &Target,
    session: &dyn BrowserSession,
    classifier: &Classifier,
    policy: &RetryPolicy,
    pacer: &dyn Pacer,
) -> VisitOutcome {
    let deadline = Duration::from_millis(policy.nav_timeout_ms);
    let max_attempts = policy.max_attempts.max(1);

    let mut last_status = 0u16;
    let mut last_error = String::from("no attempt made");
    let mut attempts = 0u32;
    let mut success = false;

    for attempt in 1..=max_attempts {
        attempts = attempt;
        match session.navigate(&target.url, deadline).await {
            Ok(navigation) => {
                let observation = collect_observation(session, navigation).await;
                last_status = observation.status;
                let verdict = classifier.classify(&observation, target);
                if verdict.passed {
                    success = true;
                    last_error.clear();
                    info!(target: "sitewatch", url = %target.url, attempt, status = observation.status, "visit healthy");
                    break;
                }
                last_error = verdict
                    .reason
                    .unwrap_or_else(|| "classification failed".to_string());
                warn!(target: "sitewatch", url = %target.url, attempt, error = %last_error, "visit unhealthy");
            }
            Err(err) => {
                last_status = 0;
                last_error = err.to_string();
                warn!(target: "sitewatch", url = %target.url, attempt, error = %last_error, "navigation fault");
            }
        }

        if attempt < max_attempts {
            let wait = policy.backoff(attempt);
            debug!(target: "sitewatch", url = %target.url, attempt, wait_ms = wait.as_millis() as u64, "backing off");
            pacer.sleep(wait).await;
        }
    }

    // Paces the whole sequence, not just retries.
    pacer.sleep(policy.visit_gap()).await;

    VisitOutcome {
        timestamp: Utc::now(),
        url: target.url.clone(),
        status: last_status,
        success,
        attempts,
        error: last_error,
    }
}
