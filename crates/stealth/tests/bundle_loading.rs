use std::fs;

use stealth::{fingerprint_for, load_bundle_from_path, ConfigError};
use tempfile::tempdir;

const BUNDLE: &str = r#"
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
"#;

#[test]
fn loads_bundle_from_disk_and_builds_overrides() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profiles.yaml");
    fs::write(&path, BUNDLE).unwrap();

    let bundle = load_bundle_from_path(&path).expect("bundle loads");
    let profile = bundle.select(None).expect("default profile");
    let fingerprint = fingerprint_for(profile);

    assert_eq!(
        fingerprint.accept_language.as_deref(),
        Some("en-US,en;q=0.9")
    );
    assert_eq!(fingerprint.platform.as_deref(), Some("Win32"));
    assert_eq!(fingerprint.viewport, Some((1366, 768, 1.0, false)));
}

#[test]
fn missing_bundle_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = load_bundle_from_path(dir.path().join("nope.yaml")).expect_err("must fail");
    assert!(matches!(err, ConfigError::Io(_)));
}
