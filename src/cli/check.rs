use anyhow::{anyhow, Context, Result};
use clap::Args;
use tracing::info;

use browser_adapter::config::SessionConfig;
use browser_adapter::ChromiumSession;

use crate::config::ProbeConfig;
use crate::retry::{attempt_visit, TokioPacer};
use crate::types::Target;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// URL to check once
    pub url: String,

    /// Launch the browser with a visible window
    #[arg(long)]
    pub headed: bool,
}

/// Single visit, single attempt, no pacing and no artifacts. Exit status is
/// the verdict.
pub async fn cmd_check(args: CheckArgs, mut config: ProbeConfig) -> Result<()> {
    config.retry.max_attempts = 1;
    config.retry.min_visit_gap_ms = 0;
    config.retry.max_visit_gap_ms = 0;

    let target = Target::new(&args.url);

    let mut session_config = SessionConfig::default();
    if args.headed {
        session_config.headless = false;
    }
    let session = ChromiumSession::launch(session_config)
        .await
        .context("launching browser session")?;

    let pacer = TokioPacer;
    let outcome = attempt_visit(
        &target,
        &session,
        &config.classifier,
        &config.retry,
        &pacer,
    )
    .await;
    session.close().await;

    info!(
        target: "sitewatch",
        url = %outcome.url,
        status = outcome.status,
        success = outcome.success,
        "check finished"
    );
    if outcome.success {
        println!("OK {} (status {})", outcome.url, outcome.status);
        Ok(())
    } else {
        println!(
            "FAIL {} (status {}): {}",
            outcome.url, outcome.status, outcome.error
        );
        Err(anyhow!("check failed"))
    }
}
