//! This module implements the CLI interface for ci-type-sync: command parsing,
//! configuration loading and wiring of the concrete collaborators.
//!
//! All business logic (report building, rendering, the Confluence protocol) lives in
//! the [`ci-type-sync-core`] crate. This module is strictly CLI glue.
//!
//! ## How To Use
//! - Command line: `ci-type-sync sync --config sync.yaml [--out page.xhtml]`.
//! - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
//!
//! [`ci-type-sync-core`]: ../../ci-type-sync-core/

use crate::load_config::{load_config, load_snapshot, SourceConfig};
use crate::postgres_source::PostgresSource;
use anyhow::Result;
use ci_type_sync_core::contract::RelationalSource;
use ci_type_sync_core::page_sync::PageSync;
use ci_type_sync_core::render::HandlebarsRenderer;
use ci_type_sync_core::synchronise::synchronise;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for ci-type-sync: publish the CI type groups table.
#[derive(Parser)]
#[clap(
    name = "ci-type-sync",
    version,
    about = "Regenerate the CI_TYPE_GROUPS and CI_TYPES table and publish it to Confluence"
)]
pub struct Cli {
    /// Maximum log level: error, warn, info, debug or trace
    #[clap(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild the table from the delivery database and replace the page content
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,

        /// Write the rendered page to this file instead of Confluence
        #[clap(long)]
        out: Option<PathBuf>,
    },
}

async fn open_source(config: &SourceConfig) -> Result<Box<dyn RelationalSource>> {
    match config {
        SourceConfig::Postgres(pg) => Ok(Box::new(PostgresSource::connect(pg).await?)),
        SourceConfig::Snapshot(path) => Ok(Box::new(load_snapshot(path)?)),
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config, out } => {
            let config = load_config(config, out)?;
            config.sync.trace_loaded();
            tracing::info!(command = "sync", "Starting synchronisation process");

            let source = open_source(&config.source).await?;
            let renderer = match &config.template {
                Some(path) => HandlebarsRenderer::from_file(path),
                None => HandlebarsRenderer::builtin(),
            }
            .map_err(|e| anyhow::anyhow!("Failed to load page template: {e}"))?;
            let publisher = PageSync::new(config.sync.destination.clone());

            match synchronise(&config.sync, source.as_ref(), &renderer, &publisher).await {
                Ok(report) => {
                    tracing::info!(command = "sync", ?report, "Synchronisation complete");
                    println!(
                        "Synchronise complete: {} groups, {} CI types ({} ungrouped)",
                        report.groups, report.types, report.ungrouped_types
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(anyhow::Error::new(e).context("Synchronisation failed"))
                }
            }
        }
    }
}
