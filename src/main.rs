use anyhow::Result;

use sitewatch_cli::cli::app;

#[tokio::main]
async fn main() -> Result<()> {
    app::run().await
}
