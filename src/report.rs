//! Artifact writing: tabular report, structured report, and text summary.
//!
//! One artifact set per run, timestamped from the run start so reruns never
//! clobber each other. Failure and crash summaries go through the same
//! directory so the delivery side only ever watches one place.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::errors::ProbeError;
use crate::types::RunReport;

pub struct ReportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
    pub summary: PathBuf,
}

pub struct Reporter {
    dir: PathBuf,
}

impl Reporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the full artifact set for a completed run.
    pub fn write_run(&self, report: &RunReport) -> Result<ReportPaths, ProbeError> {
        fs::create_dir_all(&self.dir)?;
        let stamp = stamp(report.started);

        let csv_path = self.dir.join(format!("visits-{stamp}.csv"));
        let mut writer = csv::Writer::from_path(&csv_path)?;
        writer.write_record(["timestamp", "url", "status", "success", "attempts", "error"])?;
        for outcome in &report.outcomes {
            writer.write_record([
                outcome
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                outcome.url.clone(),
                outcome.status.to_string(),
                outcome.success.to_string(),
                outcome.attempts.to_string(),
                outcome.error.clone(),
            ])?;
        }
        writer.flush()?;

        let json_path = self.dir.join(format!("visits-{stamp}.json"));
        fs::write(&json_path, serde_json::to_string_pretty(report)?)?;

        let summary_path = self.dir.join(format!("summary-{stamp}.txt"));
        fs::write(&summary_path, Self::render_summary(report))?;

        info!(
            target: "sitewatch",
            dir = %self.dir.display(),
            "artifacts written"
        );

        Ok(ReportPaths {
            csv: csv_path,
            json: json_path,
            summary: summary_path,
        })
    }

    pub fn render_summary(report: &RunReport) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Sitewatch run {}\n",
            report.started.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        out.push_str(&format!("Total URLs: {}\n", report.outcomes.len()));
        out.push_str(&format!("Succeeded: {}\n", report.success_count()));
        out.push_str(&format!("Failed: {}\n", report.failure_count()));
        if report.failure_count() > 0 {
            out.push_str("\nFailures:\n");
            for outcome in report.outcomes.iter().filter(|o| !o.success) {
                out.push_str(&format!(" - {} (status {})\n", outcome.url, outcome.status));
            }
        }
        out
    }

    /// Terminal summary for a run that never got past authentication.
    pub fn write_failure_summary(
        &self,
        reason: &str,
        started: DateTime<Utc>,
    ) -> Result<PathBuf, ProbeError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("auth-failure-{}.txt", stamp(started)));
        fs::write(
            &path,
            format!(
                "Sitewatch run {}\nAuthentication failed, no URLs visited.\nReason: {reason}\n",
                started.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
        )?;
        Ok(path)
    }

    /// Best-effort note for the unhandled-fault path.
    pub fn write_crash_summary(&self, message: &str) -> Result<PathBuf, ProbeError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("crash-{}.txt", stamp(Utc::now())));
        fs::write(
            &path,
            format!("Sitewatch run aborted by an unhandled fault.\n{message}\n"),
        )?;
        Ok(path)
    }

    pub fn write_screenshot(&self, name: &str, png: &[u8]) -> Result<PathBuf, ProbeError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, png)?;
        Ok(path)
    }
}

fn stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VisitOutcome;
    use tempfile::tempdir;

    fn report_with(outcomes: Vec<VisitOutcome>) -> RunReport {
        RunReport {
            started: Utc::now(),
            outcomes,
        }
    }

    fn failed_outcome(url: &str, status: u16, error: &str) -> VisitOutcome {
        VisitOutcome {
            timestamp: Utc::now(),
            url: url.into(),
            status,
            success: false,
            attempts: 3,
            error: error.into(),
        }
    }

    #[test]
    fn empty_run_summary_states_zero_totals() {
        let summary = Reporter::render_summary(&report_with(Vec::new()));
        assert!(summary.contains("Total URLs: 0"));
        assert!(summary.contains("Succeeded: 0"));
        assert!(!summary.contains("Failures:"));
    }

    #[test]
    fn failures_are_listed_with_status() {
        let summary = Reporter::render_summary(&report_with(vec![failed_outcome(
            "https://example.com",
            503,
            "blocked",
        )]));
        assert!(summary.contains("Failed: 1"));
        assert!(summary.contains(" - https://example.com (status 503)"));
    }

    #[test]
    fn write_run_produces_all_three_artifacts() {
        let dir = tempdir().unwrap();
        let reporter = Reporter::new(dir.path());
        let report = report_with(vec![failed_outcome(
            "https://example.com",
            0,
            "error with \"quotes\", and a comma",
        )]);

        let paths = reporter.write_run(&report).expect("artifacts written");
        assert!(paths.csv.exists());
        assert!(paths.json.exists());
        assert!(paths.summary.exists());

        let csv_raw = fs::read_to_string(&paths.csv).unwrap();
        let mut lines = csv_raw.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,url,status,success,attempts,error"
        );
        // The csv writer must quote-escape the error field.
        assert!(csv_raw.contains("\"error with \"\"quotes\"\", and a comma\""));

        let parsed: RunReport = serde_json::from_str(&fs::read_to_string(&paths.json).unwrap())
            .expect("json artifact round-trips");
        assert_eq!(parsed.outcomes.len(), 1);
    }

    #[test]
    fn failure_summary_names_the_reason() {
        let dir = tempdir().unwrap();
        let reporter = Reporter::new(dir.path());
        let path = reporter
            .write_failure_summary("still on login surface", Utc::now())
            .unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("no URLs visited"));
        assert!(text.contains("still on login surface"));
    }
}
