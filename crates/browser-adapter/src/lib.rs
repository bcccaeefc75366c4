//! Browser session capability for the sitewatch probe.
//!
//! This crate owns everything that touches a real rendering engine: the narrow
//! [`BrowserSession`] trait the visit engine drives, a Chromium implementation
//! over the DevTools protocol, Chrome executable discovery, and a scripted
//! in-memory session used by tests.

use std::{env, path::PathBuf};

use which::which;

pub mod scripted;
pub mod session;

pub use error::{SessionError, SessionErrorKind};
pub use session::{BrowserSession, ChromiumSession, Fingerprint, NavigationOutcome};

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level failure categories surfaced by a browser session.
    #[derive(Clone, Debug, Error, Serialize, Deserialize)]
    pub enum SessionErrorKind {
        #[error("navigation timed out")]
        NavTimeout,
        #[error("browser i/o failure")]
        BrowserIo,
        #[error("target element not found")]
        ElementNotFound,
        #[error("script evaluation failed")]
        EvalFailed,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to the visit engine.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SessionError {
        pub kind: SessionErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
    }

    impl fmt::Display for SessionError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for SessionError {}

    impl SessionError {
        pub fn new(kind: SessionErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }
    }
}

pub mod config {
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{env, path::PathBuf};

    /// Configuration for launching the Chromium session.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SessionConfig {
        pub executable: Option<PathBuf>,
        pub user_data_dir: PathBuf,
        pub headless: bool,
        pub window_width: u32,
        pub window_height: u32,
    }

    impl Default for SessionConfig {
        fn default() -> Self {
            Self {
                executable: detect_chrome_executable(),
                user_data_dir: env::var("SITEWATCH_CHROME_PROFILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./.sitewatch-profile")),
                headless: !headful_requested(),
                window_width: 1366,
                window_height: 900,
            }
        }
    }

    /// `SITEWATCH_HEADLESS` set to 0/false/no/off opens a visible window.
    fn headful_requested() -> bool {
        env::var("SITEWATCH_HEADLESS")
            .map(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "no" | "off"
                )
            })
            .unwrap_or(false)
    }
}

/// Locate a Chromium binary for the session to launch.
///
/// `SITEWATCH_CHROME` wins when it points at an existing file; otherwise the
/// well-known binary names are looked up on PATH, then the usual install
/// locations are probed. `SITEWATCH_SKIP_OS_PATHS` disables that last step.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Some(path) = env_override() {
        return Some(path);
    }

    if let Some(path) = BINARY_NAMES.iter().find_map(|name| which(name).ok()) {
        return Some(path);
    }

    let skip_install_paths = env::var("SITEWATCH_SKIP_OS_PATHS")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    if skip_install_paths {
        return None;
    }
    install_candidates().find(|path| path.exists())
}

fn env_override() -> Option<PathBuf> {
    let raw = env::var("SITEWATCH_CHROME").ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let path = PathBuf::from(trimmed);
    path.exists().then_some(path)
}

/// Binary names tried on PATH, most specific first.
const BINARY_NAMES: &[&str] = if cfg!(target_os = "windows") {
    &["chrome.exe", "chromium.exe"]
} else {
    &[
        "chromium",
        "chromium-browser",
        "google-chrome",
        "google-chrome-stable",
    ]
};

/// Install locations probed when PATH lookup fails. Windows installs are
/// expected to expose chrome.exe on PATH instead.
fn install_candidates() -> impl Iterator<Item = PathBuf> {
    [
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ]
    .into_iter()
    .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::detect_chrome_executable;
    use std::sync::{Mutex, MutexGuard};
    use std::{env, fs};
    use tempfile::tempdir;

    /// Serializes tests that rewrite the discovery environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Holds the lock, blanks out discovery inputs, and restores the previous
    /// values on drop.
    struct DiscoveryEnv {
        _guard: MutexGuard<'static, ()>,
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl DiscoveryEnv {
        const VARS: [&'static str; 3] = ["SITEWATCH_CHROME", "SITEWATCH_SKIP_OS_PATHS", "PATH"];

        fn isolated() -> Self {
            let guard = ENV_LOCK.lock().unwrap();
            let saved = Self::VARS
                .iter()
                .map(|&key| (key, env::var(key).ok()))
                .collect();
            env::remove_var("SITEWATCH_CHROME");
            env::set_var("SITEWATCH_SKIP_OS_PATHS", "1");
            env::set_var("PATH", "");
            Self {
                _guard: guard,
                saved,
            }
        }
    }

    impl Drop for DiscoveryEnv {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn env_override_wins_when_it_exists() {
        let _env = DiscoveryEnv::isolated();
        let dir = tempdir().unwrap();
        let exe = dir.path().join("chromium-nightly");
        fs::write(&exe, b"").unwrap();

        env::set_var("SITEWATCH_CHROME", &exe);
        assert_eq!(detect_chrome_executable(), Some(exe));
    }

    #[test]
    fn dangling_env_override_is_ignored() {
        let _env = DiscoveryEnv::isolated();
        env::set_var("SITEWATCH_CHROME", "/definitely/not/installed/here");
        assert_eq!(detect_chrome_executable(), None);
    }

    #[test]
    fn path_lookup_finds_a_chromium_binary() {
        let _env = DiscoveryEnv::isolated();
        let dir = tempdir().unwrap();
        let name = if cfg!(target_os = "windows") {
            "chromium.exe"
        } else {
            "chromium"
        };
        let exe = dir.path().join(name);
        fs::write(&exe, b"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        }

        env::set_var("PATH", dir.path());
        assert_eq!(detect_chrome_executable(), Some(exe));
    }
}
