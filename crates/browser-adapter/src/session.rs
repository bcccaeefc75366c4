//! Chromium-backed implementation of the [`BrowserSession`] capability.
//!
//! One session maps to one browser process with a single reused page. The
//! probe is deliberately sequential, so no page registry is needed: every
//! navigation and evaluation goes through the same tab.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTimezoneOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventResponseReceived, ResourceType,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionErrorKind};

/// What one navigation attempt could observe at the network level.
///
/// `status` is 0 when no document response was seen before the drain window
/// closed (navigation error, client-side routing, blocked response).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NavigationOutcome {
    pub status: u16,
    pub final_url: String,
}

/// Fingerprint overrides applied once per run, before any visit.
#[derive(Clone, Debug, Default)]
pub struct Fingerprint {
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub platform: Option<String>,
    pub timezone: Option<String>,
    /// width, height, device scale factor, mobile
    pub viewport: Option<(u32, u32, f64, bool)>,
}

/// Minimal capability surface the visit engine and authenticator drive.
///
/// Kept narrow on purpose: anything not needed by the retry loop or the
/// login sub-flow stays out, so tests can fake the whole surface.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the shared page and report the main-document status plus the
    /// post-redirect URL.
    async fn navigate(
        &self,
        url: &str,
        deadline: Duration,
    ) -> Result<NavigationOutcome, SessionError>;

    /// Evaluate a script expression in the page and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value, SessionError>;

    /// URL the page currently shows, after any client-side routing.
    async fn current_url(&self) -> Result<String, SessionError>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str, deadline: Duration) -> Result<(), SessionError>;

    /// Focus the first element matching `selector` and type `text` into it.
    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        deadline: Duration,
    ) -> Result<(), SessionError>;

    /// PNG capture of the current page.
    async fn screenshot(&self) -> Result<Vec<u8>, SessionError>;
}

pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: Mutex<Option<JoinHandle<()>>>,
    /// How long to keep draining document responses after `goto` resolves.
    response_drain: Duration,
}

impl ChromiumSession {
    pub async fn launch(cfg: SessionConfig) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&cfg.user_data_dir)
            .window_size(cfg.window_width, cfg.window_height);
        if let Some(path) = &cfg.executable {
            builder = builder.chrome_executable(path);
        }
        if !cfg.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|err| SessionError::new(SessionErrorKind::Internal).with_hint(err))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|err| {
            SessionError::new(SessionErrorKind::BrowserIo)
                .with_hint(format!("browser launch failed: {err}"))
        })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "browser-adapter", ?err, "handler stream error");
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(|err| {
            SessionError::new(SessionErrorKind::BrowserIo)
                .with_hint(format!("initial page failed: {err}"))
        })?;

        // Document responses are how visit status is observed.
        page.execute(NetworkEnableParams::default())
            .await
            .map_err(|err| {
                SessionError::new(SessionErrorKind::BrowserIo)
                    .with_hint(format!("Network.enable failed: {err}"))
            })?;

        info!(
            target: "browser-adapter",
            headless = cfg.headless,
            "chromium session ready"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler: Mutex::new(Some(handle)),
            response_drain: Duration::from_millis(500),
        })
    }

    /// Apply fingerprint overrides to the shared page.
    pub async fn apply_fingerprint(&self, fingerprint: &Fingerprint) -> Result<(), SessionError> {
        if let Some(user_agent) = &fingerprint.user_agent {
            let mut builder = SetUserAgentOverrideParams::builder().user_agent(user_agent);
            if let Some(accept_language) = &fingerprint.accept_language {
                builder = builder.accept_language(accept_language);
            }
            if let Some(platform) = &fingerprint.platform {
                builder = builder.platform(platform);
            }
            let params = builder
                .build()
                .map_err(|err| SessionError::new(SessionErrorKind::Internal).with_hint(err))?;
            self.page.execute(params).await.map_err(|err| {
                SessionError::new(SessionErrorKind::BrowserIo)
                    .with_hint(format!("user agent override failed: {err}"))
            })?;
        }

        if let Some((width, height, scale, mobile)) = fingerprint.viewport {
            let params = SetDeviceMetricsOverrideParams::builder()
                .width(width as i64)
                .height(height as i64)
                .device_scale_factor(scale)
                .mobile(mobile)
                .build()
                .map_err(|err| SessionError::new(SessionErrorKind::Internal).with_hint(err))?;
            self.page.execute(params).await.map_err(|err| {
                SessionError::new(SessionErrorKind::BrowserIo)
                    .with_hint(format!("device metrics override failed: {err}"))
            })?;
        }

        if let Some(timezone) = &fingerprint.timezone {
            self.page
                .execute(SetTimezoneOverrideParams::new(timezone))
                .await
                .map_err(|err| {
                    SessionError::new(SessionErrorKind::BrowserIo)
                        .with_hint(format!("timezone override failed: {err}"))
                })?;
        }

        Ok(())
    }

    pub async fn close(&self) {
        if let Err(err) = self.browser.lock().await.close().await {
            warn!(target: "browser-adapter", ?err, "browser close failed");
        }
        if let Some(handle) = self.handler.lock().await.take() {
            let _ = handle.await;
        }
    }

    async fn find_element(
        &self,
        selector: &str,
        deadline: Duration,
    ) -> Result<chromiumoxide::element::Element, SessionError> {
        match timeout(deadline, self.page.find_element(selector)).await {
            Err(_) => Err(SessionError::new(SessionErrorKind::ElementNotFound)
                .with_hint(format!("timed out locating {selector}"))),
            Ok(Err(err)) => Err(SessionError::new(SessionErrorKind::ElementNotFound)
                .with_hint(format!("{selector}: {err}"))),
            Ok(Ok(element)) => Ok(element),
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(
        &self,
        url: &str,
        deadline: Duration,
    ) -> Result<NavigationOutcome, SessionError> {
        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|err| {
                SessionError::new(SessionErrorKind::BrowserIo)
                    .with_hint(format!("response listener failed: {err}"))
            })?;

        match timeout(deadline, self.page.goto(url)).await {
            Err(_) => {
                return Err(SessionError::new(SessionErrorKind::NavTimeout)
                    .with_hint(format!("navigation to {url} exceeded {deadline:?}"))
                    .retriable(true));
            }
            Ok(Err(err)) => {
                return Err(SessionError::new(SessionErrorKind::BrowserIo)
                    .with_hint(format!("navigation to {url} failed: {err}"))
                    .retriable(true));
            }
            Ok(Ok(_)) => {}
        }

        // Redirect chains produce several document responses; the last hop is
        // the status the page actually rendered with.
        let mut status = 0u16;
        while let Ok(Some(event)) = timeout(self.response_drain, responses.next()).await {
            if matches!(event.r#type, ResourceType::Document) {
                status = u16::try_from(event.response.status).unwrap_or(0);
                debug!(
                    target: "browser-adapter",
                    status,
                    url = %event.response.url,
                    "document response"
                );
            }
        }

        let final_url = self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        Ok(NavigationOutcome { status, final_url })
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, SessionError> {
        let result = self.page.evaluate(expression).await.map_err(|err| {
            SessionError::new(SessionErrorKind::EvalFailed).with_hint(err.to_string())
        })?;
        result.into_value::<Value>().map_err(|err| {
            SessionError::new(SessionErrorKind::EvalFailed)
                .with_hint(format!("result not deserializable: {err}"))
        })
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        self.page
            .url()
            .await
            .map_err(|err| {
                SessionError::new(SessionErrorKind::BrowserIo).with_hint(err.to_string())
            })
            .map(Option::unwrap_or_default)
    }

    async fn click(&self, selector: &str, deadline: Duration) -> Result<(), SessionError> {
        let element = self.find_element(selector, deadline).await?;
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|err| {
                SessionError::new(SessionErrorKind::BrowserIo)
                    .with_hint(format!("click {selector} failed: {err}"))
            })
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        deadline: Duration,
    ) -> Result<(), SessionError> {
        let element = self.find_element(selector, deadline).await?;
        element.click().await.map_err(|err| {
            SessionError::new(SessionErrorKind::BrowserIo)
                .with_hint(format!("focus {selector} failed: {err}"))
        })?;
        element
            .type_str(text)
            .await
            .map(|_| ())
            .map_err(|err| {
                SessionError::new(SessionErrorKind::BrowserIo)
                    .with_hint(format!("type into {selector} failed: {err}"))
            })
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        self.page
            .screenshot(ScreenshotParams::builder().build())
            .await
            .map_err(|err| {
                SessionError::new(SessionErrorKind::BrowserIo)
                    .with_hint(format!("screenshot failed: {err}"))
            })
    }
}
