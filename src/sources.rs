//! URL source ingestion.
//!
//! The source is a newline-delimited table. The first non-comment line must
//! be a header containing "url" (case-insensitive); every later non-empty,
//! non-comment line contributes one target, taken as the text before the
//! first comma. A missing header fails fast with no retry.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::ProbeError;
use crate::types::Target;

pub fn load_targets(path: &Path) -> Result<Vec<Target>, ProbeError> {
    let raw = fs::read_to_string(path)
        .map_err(|err| ProbeError::Source(format!("{}: {err}", path.display())))?;
    parse_targets(&raw)
}

pub fn parse_targets(raw: &str) -> Result<Vec<Target>, ProbeError> {
    let mut lines = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let header = lines
        .next()
        .ok_or_else(|| ProbeError::Source("url list is empty".to_string()))?;
    if !header.to_ascii_lowercase().contains("url") {
        return Err(ProbeError::Source(format!(
            "first line must be a header containing \"url\", got: {header}"
        )));
    }

    let targets: Vec<Target> = lines
        .map(|line| {
            let url = line.split(',').next().unwrap_or_default().trim();
            Target::new(url)
        })
        .collect();
    debug!(target: "sitewatch", count = targets.len(), "parsed url source");
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_only_source_yields_empty_list() {
        let targets = parse_targets("url,notes\n").expect("header parses");
        assert!(targets.is_empty());
    }

    #[test]
    fn missing_header_fails_fast() {
        let err = parse_targets("https://example.com\n").expect_err("no header");
        assert!(matches!(err, ProbeError::Source(_)));
    }

    #[test]
    fn empty_source_fails_fast() {
        assert!(parse_targets("\n\n").is_err());
    }

    #[test]
    fn takes_text_before_first_comma() {
        let raw = "URL,label\nhttps://example.com/dp/1,front page\nhttps://shop.example.de,de\n";
        let targets = parse_targets(raw).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].url, "https://example.com/dp/1");
        assert_eq!(targets[1].host, "shop.example.de");
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let raw = "# probe targets\nurl\n\n# disabled\nhttps://example.com\n";
        let targets = parse_targets(raw).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].url, "https://example.com");
    }
}
