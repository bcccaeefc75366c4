//! Browser fingerprint profiles for the sitewatch probe.
//!
//! A profile bundles the identity a run presents to target sites: user agent,
//! accept-language, platform, locale, timezone, and viewport. Bundles load
//! from JSON or YAML and one selected profile is converted into the adapter's
//! [`Fingerprint`] overrides before any visit happens.

pub mod config;

pub use config::{
    load_bundle_from_path, load_bundle_from_reader, parse_bundle_str, ConfigError,
    FingerprintProfile, ProfileBundle, Viewport,
};

use browser_adapter::Fingerprint;

/// Convert a profile into the override set the Chromium session applies.
pub fn fingerprint_for(profile: &FingerprintProfile) -> Fingerprint {
    Fingerprint {
        user_agent: Some(profile.user_agent.clone()),
        accept_language: profile
            .accept_language
            .clone()
            .or_else(|| profile.locale.clone()),
        platform: profile.platform.clone(),
        timezone: profile.timezone.clone(),
        viewport: profile.viewport.as_ref().map(|viewport| {
            (
                viewport.width,
                viewport.height,
                viewport.device_scale_factor,
                viewport.mobile,
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE_YAML: &str = r#"
default: desktop-us
profiles:
  - name: desktop-us
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/124.0 Safari/537.36"
    accept_language: en-US,en;q=0.9
    platform: Win32
    timezone: America/New_York
    viewport:
      width: 1366
      height: 768
  - name: mobile-de
    user_agent: "Mozilla/5.0 (Linux; Android 14) Chrome/124.0 Mobile Safari/537.36"
    locale: de-DE
    viewport:
      width: 412
      height: 915
      device_scale_factor: 2.6
      mobile: true
"#;

    #[test]
    fn parses_yaml_bundle_and_selects_default() {
        let bundle = parse_bundle_str(BUNDLE_YAML).expect("bundle parses");
        let profile = bundle.select(None).expect("default profile");
        assert_eq!(profile.name, "desktop-us");
        assert_eq!(profile.viewport.as_ref().unwrap().width, 1366);
    }

    #[test]
    fn parses_json_bundle() {
        let raw = r#"{"profiles":[{"name":"only","user_agent":"ua"}]}"#;
        let bundle = parse_bundle_str(raw).expect("json bundle parses");
        assert_eq!(bundle.select(None).unwrap().name, "only");
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let bundle = parse_bundle_str(BUNDLE_YAML).unwrap();
        assert!(matches!(
            bundle.select(Some("missing")),
            Err(ConfigError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn locale_backfills_accept_language() {
        let bundle = parse_bundle_str(BUNDLE_YAML).unwrap();
        let profile = bundle.select(Some("mobile-de")).unwrap();
        let fingerprint = fingerprint_for(profile);
        assert_eq!(fingerprint.accept_language.as_deref(), Some("de-DE"));
        assert_eq!(fingerprint.viewport, Some((412, 915, 2.6, true)));
    }
}
