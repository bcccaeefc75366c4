//! Scripted in-memory session for tests.
//!
//! Plays back a queue of pre-built navigation outcomes and page snapshots so
//! the retry controller and authenticator can be exercised without a
//! rendering engine. Form interactions are recorded for assertions.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{SessionError, SessionErrorKind};
use crate::session::{BrowserSession, NavigationOutcome};

/// One scripted navigation: the outcome `navigate` returns and the page
/// snapshot `evaluate` yields while this step is current.
pub struct ScriptedStep {
    pub navigation: Result<NavigationOutcome, SessionError>,
    pub page: Value,
}

impl ScriptedStep {
    pub fn ok(status: u16, final_url: &str, page: Value) -> Self {
        Self {
            navigation: Ok(NavigationOutcome {
                status,
                final_url: final_url.to_string(),
            }),
            page,
        }
    }

    pub fn fault(hint: &str) -> Self {
        Self {
            navigation: Err(SessionError::new(SessionErrorKind::BrowserIo)
                .with_hint(hint)
                .retriable(true)),
            page: Value::Null,
        }
    }
}

#[derive(Default)]
pub struct ScriptedSession {
    steps: Mutex<VecDeque<ScriptedStep>>,
    current_page: Mutex<Value>,
    last_url: Mutex<String>,
    /// URLs handed out by `current_url`; drained to the last entry, which
    /// then repeats. When empty, the last navigated URL is reported.
    url_script: Mutex<VecDeque<String>>,
    pub typed: Mutex<Vec<(String, String)>>,
    pub clicked: Mutex<Vec<String>>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, step: ScriptedStep) {
        self.steps.lock().unwrap().push_back(step);
    }

    pub fn enqueue_url(&self, url: &str) {
        self.url_script.lock().unwrap().push_back(url.to_string());
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(
        &self,
        url: &str,
        _deadline: Duration,
    ) -> Result<NavigationOutcome, SessionError> {
        let step = self.steps.lock().unwrap().pop_front().ok_or_else(|| {
            SessionError::new(SessionErrorKind::Internal)
                .with_hint(format!("no scripted step for navigation to {url}"))
        })?;
        match step.navigation {
            Ok(outcome) => {
                *self.current_page.lock().unwrap() = step.page;
                *self.last_url.lock().unwrap() = outcome.final_url.clone();
                Ok(outcome)
            }
            Err(err) => {
                *self.current_page.lock().unwrap() = Value::Null;
                Err(err)
            }
        }
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value, SessionError> {
        Ok(self.current_page.lock().unwrap().clone())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        let mut script = self.url_script.lock().unwrap();
        match script.len() {
            0 => Ok(self.last_url.lock().unwrap().clone()),
            1 => Ok(script
                .front()
                .cloned()
                .unwrap_or_default()),
            _ => Ok(script.pop_front().unwrap_or_default()),
        }
    }

    async fn click(&self, selector: &str, _deadline: Duration) -> Result<(), SessionError> {
        self.clicked.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        _deadline: Duration,
    ) -> Result<(), SessionError> {
        self.typed
            .lock()
            .unwrap()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        Ok(Vec::new())
    }
}
