//! Fingerprint profile definitions and bundle loading.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize profile bundle: {0}")]
    Deserialize(String),
    #[error("profile not found: {0}")]
    ProfileNotFound(String),
    #[error("profile bundle is empty")]
    EmptyBundle,
}

/// A set of named fingerprint profiles plus an optional default selection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileBundle {
    pub profiles: Vec<FingerprintProfile>,
    #[serde(default)]
    pub default: Option<String>,
}

impl ProfileBundle {
    /// Pick a profile by name, falling back to the bundle default and then to
    /// the first profile.
    pub fn select(&self, name: Option<&str>) -> Result<&FingerprintProfile, ConfigError> {
        let wanted = name.or(self.default.as_deref());
        match wanted {
            Some(wanted) => self
                .profiles
                .iter()
                .find(|profile| profile.name == wanted)
                .ok_or_else(|| ConfigError::ProfileNotFound(wanted.to_string())),
            None => self.profiles.first().ok_or(ConfigError::EmptyBundle),
        }
    }
}

/// One browser identity: everything the probe overrides before a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FingerprintProfile {
    pub name: String,
    pub user_agent: String,
    #[serde(default)]
    pub accept_language: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub viewport: Option<Viewport>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default = "Viewport::default_scale_factor")]
    pub device_scale_factor: f64,
    #[serde(default)]
    pub mobile: bool,
}

impl Viewport {
    fn default_scale_factor() -> f64 {
        1.0
    }
}

pub fn load_bundle_from_reader<R: Read>(mut reader: R) -> Result<ProfileBundle, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_bundle_str(&buf)
}

pub fn load_bundle_from_path(path: impl AsRef<Path>) -> Result<ProfileBundle, ConfigError> {
    let file = File::open(path.as_ref())?;
    load_bundle_from_reader(file)
}

pub fn parse_bundle_str(raw: &str) -> Result<ProfileBundle, ConfigError> {
    match serde_json::from_str(raw) {
        Ok(bundle) => Ok(bundle),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ConfigError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        }),
    }
}
