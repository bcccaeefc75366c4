//! One immutable configuration value for a whole run.
//!
//! Every tunable (retry counts, jitter bounds, thresholds, selectors) lives
//! here and is handed to the visit engine at construction; nothing reads
//! ambient constants at visit time. Files parse as JSON first, then YAML.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::AuthConfig;
use crate::classify::Classifier;
use crate::errors::ProbeError;
use crate::retry::RetryPolicy;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub classifier: Classifier,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Login sub-flow; entered only when credentials are also present in the
    /// environment.
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default = "ProbeConfig::default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default)]
    pub fingerprint_bundle: Option<PathBuf>,
    #[serde(default)]
    pub fingerprint_profile: Option<String>,
    #[serde(default)]
    pub screenshot_on_failure: bool,
}

impl ProbeConfig {
    fn default_artifacts_dir() -> PathBuf {
        PathBuf::from("./sitewatch-artifacts")
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            classifier: Classifier::default(),
            retry: RetryPolicy::default(),
            auth: None,
            artifacts_dir: Self::default_artifacts_dir(),
            fingerprint_bundle: None,
            fingerprint_profile: None,
            screenshot_on_failure: false,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<ProbeConfig, ProbeError> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|err| ProbeError::Config(format!("{}: {err}", path.display())))?;
            debug!(target: "sitewatch", path = %path.display(), "loaded config file");
            parse_config_str(&raw)?
        }
        None => ProbeConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

pub fn parse_config_str(raw: &str) -> Result<ProbeConfig, ProbeError> {
    match serde_json::from_str(raw) {
        Ok(config) => Ok(config),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ProbeError::Config(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        }),
    }
}

fn apply_env_overrides(config: &mut ProbeConfig) {
    if let Ok(dir) = env::var("SITEWATCH_ARTIFACTS_DIR") {
        if !dir.trim().is_empty() {
            config.artifacts_dir = PathBuf::from(dir);
        }
    }
    if let Ok(raw) = env::var("SITEWATCH_MAX_ATTEMPTS") {
        if let Ok(value) = raw.parse::<u32>() {
            if value >= 1 {
                config.retry.max_attempts = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifyPolicy;

    #[test]
    fn yaml_config_parses_with_partial_fields() {
        let raw = r#"
classifier:
  policy: strict
  min_text_len: 1200
retry:
  max_attempts: 5
auth:
  login_url: https://example.com/ap/signin
"#;
        let config = parse_config_str(raw).expect("yaml parses");
        assert_eq!(config.classifier.policy, ClassifyPolicy::Strict);
        assert_eq!(config.classifier.min_text_len, 1200);
        assert!(config.classifier.host_rule_standalone);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_backoff_ms, 2_000);
        let auth = config.auth.expect("auth section");
        assert_eq!(auth.passcode_window_ms, 60_000);
        assert_eq!(auth.identifier_selector, "input[type=email]");
    }

    #[test]
    fn json_config_parses() {
        let raw = r#"{"retry": {"min_visit_gap_ms": 0, "max_visit_gap_ms": 0}}"#;
        let config = parse_config_str(raw).expect("json parses");
        assert_eq!(config.retry.max_visit_gap_ms, 0);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn garbage_config_is_a_config_error() {
        let err = parse_config_str("{not valid at all").expect_err("must fail");
        assert!(matches!(err, ProbeError::Config(_)));
    }
}
