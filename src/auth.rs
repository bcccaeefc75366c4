//! Optional pre-flight login sub-flow.
//!
//! Best-effort scripted form fill: navigate to the login surface, submit the
//! identifier and secret, then decide from the resulting URL whether the
//! session is authenticated. A second-factor surface opens a fixed wait
//! window for out-of-band completion; the flow never polls inside it.
//!
//! The contract is "attempt these steps, report success/failure" — selector
//! resilience to arbitrary markup changes is explicitly not a goal.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use browser_adapter::BrowserSession;

use crate::errors::ProbeError;
use crate::retry::Pacer;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    pub login_url: String,
    #[serde(default = "AuthConfig::default_identifier_selector")]
    pub identifier_selector: String,
    /// Some login forms reveal the secret field only after a first submit.
    #[serde(default)]
    pub continue_selector: Option<String>,
    #[serde(default = "AuthConfig::default_secret_selector")]
    pub secret_selector: String,
    #[serde(default = "AuthConfig::default_submit_selector")]
    pub submit_selector: String,
    /// URL fragments that indicate a second-factor / verification surface.
    #[serde(default = "AuthConfig::default_second_factor_markers")]
    pub second_factor_markers: Vec<String>,
    /// URL fragments that indicate the login surface itself.
    #[serde(default = "AuthConfig::default_login_markers")]
    pub login_markers: Vec<String>,
    #[serde(default = "AuthConfig::default_passcode_window_ms")]
    pub passcode_window_ms: u64,
    #[serde(default = "AuthConfig::default_step_timeout_ms")]
    pub step_timeout_ms: u64,
}

impl AuthConfig {
    fn default_identifier_selector() -> String {
        "input[type=email]".to_string()
    }

    fn default_secret_selector() -> String {
        "input[type=password]".to_string()
    }

    fn default_submit_selector() -> String {
        "button[type=submit]".to_string()
    }

    fn default_second_factor_markers() -> Vec<String> {
        vec!["mfa".into(), "cvf".into(), "verify".into()]
    }

    fn default_login_markers() -> Vec<String> {
        vec!["signin".into(), "login".into()]
    }

    fn default_passcode_window_ms() -> u64 {
        60_000
    }

    fn default_step_timeout_ms() -> u64 {
        15_000
    }
}

/// Out-of-band secrets; the sub-flow is entered iff both are non-empty.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub const IDENTIFIER_VAR: &'static str = "SITEWATCH_LOGIN_ID";
    pub const SECRET_VAR: &'static str = "SITEWATCH_LOGIN_SECRET";

    pub fn from_env() -> Option<Self> {
        let identifier = env::var(Self::IDENTIFIER_VAR).unwrap_or_default();
        let secret = env::var(Self::SECRET_VAR).unwrap_or_default();
        if identifier.trim().is_empty() || secret.trim().is_empty() {
            return None;
        }
        Some(Self { identifier, secret })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthState {
    NotStarted,
    FormLoaded,
    CredentialsSubmitted,
    AwaitingSecondFactor,
    LoggedIn,
    Failed(String),
}

pub struct Authenticator<'a> {
    config: &'a AuthConfig,
    credentials: Credentials,
    state: AuthState,
}

impl<'a> Authenticator<'a> {
    pub fn new(config: &'a AuthConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            state: AuthState::NotStarted,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Drive the login form and report the terminal state. On failure the
    /// run must not visit any target.
    pub async fn login(
        &mut self,
        session: &dyn BrowserSession,
        pacer: &dyn Pacer,
    ) -> Result<(), ProbeError> {
        let step = Duration::from_millis(self.config.step_timeout_ms);

        if let Err(err) = session.navigate(&self.config.login_url, step).await {
            return Err(self.fail(format!("login surface unreachable: {err}")));
        }
        self.state = AuthState::FormLoaded;

        if let Err(err) = session
            .type_text(
                &self.config.identifier_selector,
                &self.credentials.identifier,
                step,
            )
            .await
        {
            return Err(self.fail(format!("identifier field: {err}")));
        }

        if let Some(continue_selector) = &self.config.continue_selector {
            if let Err(err) = session.click(continue_selector, step).await {
                return Err(self.fail(format!("continue button: {err}")));
            }
        }

        if let Err(err) = session
            .type_text(&self.config.secret_selector, &self.credentials.secret, step)
            .await
        {
            return Err(self.fail(format!("secret field: {err}")));
        }

        if let Err(err) = session.click(&self.config.submit_selector, step).await {
            return Err(self.fail(format!("submit button: {err}")));
        }
        self.state = AuthState::CredentialsSubmitted;

        let after_submit = session.current_url().await.unwrap_or_default();
        if matches_any(&after_submit, &self.config.second_factor_markers) {
            self.state = AuthState::AwaitingSecondFactor;
            info!(
                target: "sitewatch",
                window_ms = self.config.passcode_window_ms,
                "second-factor surface detected, waiting for out-of-band passcode"
            );
            // Single bounded suspension; nothing else runs during it.
            pacer
                .sleep(Duration::from_millis(self.config.passcode_window_ms))
                .await;
        }

        let landed = session.current_url().await.unwrap_or_default();
        if matches_any(&landed, &self.config.login_markers) {
            return Err(self.fail(format!("still on login surface: {landed}")));
        }

        self.state = AuthState::LoggedIn;
        info!(target: "sitewatch", url = %landed, "login succeeded");
        Ok(())
    }

    fn fail(&mut self, reason: String) -> ProbeError {
        warn!(target: "sitewatch", reason = %reason, "authentication failed");
        self.state = AuthState::Failed(reason.clone());
        ProbeError::Auth(reason)
    }
}

fn matches_any(url: &str, markers: &[String]) -> bool {
    let lower = url.to_ascii_lowercase();
    markers
        .iter()
        .any(|marker| lower.contains(&marker.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use browser_adapter::scripted::{ScriptedSession, ScriptedStep};
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingPacer {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Pacer for RecordingPacer {
        async fn sleep(&self, wait: Duration) {
            self.waits.lock().unwrap().push(wait);
        }
    }

    fn config() -> AuthConfig {
        AuthConfig {
            login_url: "https://example.com/ap/signin".into(),
            identifier_selector: AuthConfig::default_identifier_selector(),
            continue_selector: Some("#continue".into()),
            secret_selector: AuthConfig::default_secret_selector(),
            submit_selector: AuthConfig::default_submit_selector(),
            second_factor_markers: AuthConfig::default_second_factor_markers(),
            login_markers: AuthConfig::default_login_markers(),
            passcode_window_ms: 60_000,
            step_timeout_ms: 1_000,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            identifier: "probe@example.com".into(),
            secret: "hunter2".into(),
        }
    }

    fn login_page_session() -> ScriptedSession {
        let session = ScriptedSession::new();
        session.enqueue(ScriptedStep::ok(
            200,
            "https://example.com/ap/signin",
            json!({"title": "Sign in"}),
        ));
        session
    }

    #[tokio::test]
    async fn straight_login_reaches_logged_in() {
        let session = login_page_session();
        session.enqueue_url("https://example.com/home");
        let pacer = RecordingPacer {
            waits: Mutex::new(Vec::new()),
        };

        let auth_config = config();
        let mut authenticator = Authenticator::new(&auth_config, credentials());
        authenticator.login(&session, &pacer).await.expect("logs in");

        assert_eq!(*authenticator.state(), AuthState::LoggedIn);
        // No second factor, so no wait window.
        assert!(pacer.waits.lock().unwrap().is_empty());

        let typed = session.typed.lock().unwrap().clone();
        assert_eq!(typed.len(), 2);
        assert_eq!(typed[0].1, "probe@example.com");
        assert_eq!(typed[1].1, "hunter2");
        let clicked = session.clicked.lock().unwrap().clone();
        assert_eq!(clicked, vec!["#continue", "button[type=submit]"]);
    }

    #[tokio::test]
    async fn second_factor_window_then_success() {
        let session = login_page_session();
        session.enqueue_url("https://example.com/ap/mfa");
        session.enqueue_url("https://example.com/home");
        let pacer = RecordingPacer {
            waits: Mutex::new(Vec::new()),
        };

        let auth_config = config();
        let mut authenticator = Authenticator::new(&auth_config, credentials());
        authenticator.login(&session, &pacer).await.expect("logs in");

        assert_eq!(*authenticator.state(), AuthState::LoggedIn);
        let waits = pacer.waits.lock().unwrap();
        assert_eq!(*waits, vec![Duration::from_millis(60_000)]);
    }

    #[tokio::test]
    async fn still_on_login_surface_fails() {
        let session = login_page_session();
        session.enqueue_url("https://example.com/ap/mfa");
        session.enqueue_url("https://example.com/ap/signin");
        let pacer = RecordingPacer {
            waits: Mutex::new(Vec::new()),
        };

        let auth_config = config();
        let mut authenticator = Authenticator::new(&auth_config, credentials());
        let err = authenticator
            .login(&session, &pacer)
            .await
            .expect_err("login must fail");

        assert!(matches!(err, ProbeError::Auth(_)));
        assert!(matches!(authenticator.state(), AuthState::Failed(_)));
    }

    #[tokio::test]
    async fn unreachable_login_surface_fails_early() {
        let session = ScriptedSession::new();
        session.enqueue(ScriptedStep::fault("net::ERR_CONNECTION_RESET"));
        let pacer = RecordingPacer {
            waits: Mutex::new(Vec::new()),
        };

        let auth_config = config();
        let mut authenticator = Authenticator::new(&auth_config, credentials());
        let err = authenticator
            .login(&session, &pacer)
            .await
            .expect_err("login must fail");

        assert!(matches!(err, ProbeError::Auth(_)));
        assert!(session.typed.lock().unwrap().is_empty());
    }
}
