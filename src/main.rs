use anyhow::Result;
use ci_type_sync::cli::{run, Cli};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing for the CLI.
    tracing_subscriber::fmt().with_max_level(cli.log_level).init();
    tracing::info!(level = %cli.log_level, "CLI application startup: tracing initialised, environment loaded");

    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
