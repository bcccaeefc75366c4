//! The visit engine: authentication pre-flight, then one sequential pass
//! over every target on a single shared browser session.
//!
//! Sequential on purpose: concurrent navigations on one session share DOM
//! and navigation state, and low request pressure is part of how the probe
//! presents to target sites.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use browser_adapter::BrowserSession;

use crate::auth::{Authenticator, Credentials};
use crate::config::ProbeConfig;
use crate::errors::ProbeError;
use crate::report::Reporter;
use crate::retry::{attempt_visit, Pacer};
use crate::types::{RunReport, Target};

/// How a run ended: the normal report, or the documented degenerate case
/// where authentication failed and no target was visited.
pub enum RunOutcome {
    Completed(RunReport),
    AuthFailed {
        reason: String,
        started: DateTime<Utc>,
    },
}

pub struct VisitEngine<'a> {
    session: &'a dyn BrowserSession,
    config: &'a ProbeConfig,
    pacer: &'a dyn Pacer,
}

impl<'a> VisitEngine<'a> {
    pub fn new(
        session: &'a dyn BrowserSession,
        config: &'a ProbeConfig,
        pacer: &'a dyn Pacer,
    ) -> Self {
        Self {
            session,
            config,
            pacer,
        }
    }

    pub async fn run(&self, targets: &[Target]) -> Result<RunOutcome, ProbeError> {
        let started = Utc::now();

        if let Some(auth_config) = &self.config.auth {
            match Credentials::from_env() {
                Some(credentials) => {
                    let mut authenticator = Authenticator::new(auth_config, credentials);
                    if let Err(err) = authenticator.login(self.session, self.pacer).await {
                        // Authenticated visits without a session are
                        // meaningless; short-circuit the whole run.
                        return Ok(RunOutcome::AuthFailed {
                            reason: err.to_string(),
                            started,
                        });
                    }
                }
                None => {
                    warn!(
                        target: "sitewatch",
                        "auth configured but {} / {} not set, visiting unauthenticated",
                        Credentials::IDENTIFIER_VAR,
                        Credentials::SECRET_VAR
                    );
                }
            }
        }

        let mut outcomes = Vec::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            info!(
                target: "sitewatch",
                url = %target.url,
                position = index + 1,
                total = targets.len(),
                "visiting"
            );
            let outcome = attempt_visit(
                target,
                self.session,
                &self.config.classifier,
                &self.config.retry,
                self.pacer,
            )
            .await;

            if !outcome.success && self.config.screenshot_on_failure {
                self.capture_failure_screenshot(index + 1).await;
            }

            outcomes.push(outcome);
        }

        Ok(RunOutcome::Completed(RunReport { started, outcomes }))
    }

    /// Best effort: the page still shows the last failed attempt.
    async fn capture_failure_screenshot(&self, position: usize) {
        match self.session.screenshot().await {
            Ok(png) => {
                let reporter = Reporter::new(&self.config.artifacts_dir);
                let name = format!("failure-{position}.png");
                if let Err(err) = reporter.write_screenshot(&name, &png) {
                    warn!(target: "sitewatch", %err, "failed to write failure screenshot");
                }
            }
            Err(err) => {
                warn!(target: "sitewatch", %err, "failure screenshot capture failed");
            }
        }
    }
}
