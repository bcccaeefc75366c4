use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use tracing::{error, info, warn};

use browser_adapter::config::SessionConfig;
use browser_adapter::ChromiumSession;

use crate::config::ProbeConfig;
use crate::engine::{RunOutcome, VisitEngine};
use crate::report::Reporter;
use crate::retry::TokioPacer;
use crate::sources::load_targets;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// File listing the URLs to visit (header line containing "url" required)
    pub urls: PathBuf,

    /// Directory to write run artifacts into
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,

    /// Override the configured attempt ceiling per URL
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Launch the browser with a visible window
    #[arg(long)]
    pub headed: bool,
}

pub async fn cmd_run(args: RunArgs, mut config: ProbeConfig) -> Result<()> {
    if let Some(dir) = args.artifacts_dir {
        config.artifacts_dir = dir;
    }
    if let Some(max_attempts) = args.max_attempts {
        if max_attempts == 0 {
            return Err(anyhow!("--max-attempts must be at least 1"));
        }
        config.retry.max_attempts = max_attempts;
    }

    let targets = load_targets(&args.urls)
        .with_context(|| format!("reading url source {}", args.urls.display()))?;
    info!(target: "sitewatch", count = targets.len(), "url source loaded");

    let reporter = Reporter::new(&config.artifacts_dir);

    let mut session_config = SessionConfig::default();
    if args.headed {
        session_config.headless = false;
    }
    let session = ChromiumSession::launch(session_config)
        .await
        .context("launching browser session")?;

    if let Err(err) = apply_fingerprint(&session, &config).await {
        warn!(target: "sitewatch", %err, "fingerprint profile not applied");
    }

    let pacer = TokioPacer;
    let engine = VisitEngine::new(&session, &config, &pacer);
    let outcome = engine.run(&targets).await;
    session.close().await;

    match outcome {
        Ok(RunOutcome::Completed(report)) => {
            let paths = reporter.write_run(&report)?;
            print!("{}", Reporter::render_summary(&report));
            println!("Artifacts: {}", paths.summary.display());
            Ok(())
        }
        Ok(RunOutcome::AuthFailed { reason, started }) => {
            let path = reporter.write_failure_summary(&reason, started)?;
            error!(target: "sitewatch", %reason, "authentication failed, no urls visited");
            println!("Authentication failed: {reason}");
            println!("Artifacts: {}", path.display());
            Err(anyhow!("authentication failed"))
        }
        Err(err) => {
            if let Err(write_err) = reporter.write_crash_summary(&err.to_string()) {
                warn!(target: "sitewatch", %write_err, "crash summary not written");
            }
            Err(err.into())
        }
    }
}

async fn apply_fingerprint(session: &ChromiumSession, config: &ProbeConfig) -> Result<()> {
    let Some(bundle_path) = &config.fingerprint_bundle else {
        return Ok(());
    };
    let bundle = stealth::load_bundle_from_path(bundle_path)?;
    let profile = bundle.select(config.fingerprint_profile.as_deref())?;
    session
        .apply_fingerprint(&stealth::fingerprint_for(profile))
        .await?;
    info!(target: "sitewatch", profile = %profile.name, "fingerprint applied");
    Ok(())
}
