//! High-level pipeline: source → report → rendered page → publisher.
//!
//! One call is one full run. Every step is awaited before the next starts and the
//! first failure ends the run; nothing is kept between runs.

use tracing::{error, info};

use crate::config::SyncConfig;
use crate::contract::{Publisher, RelationalSource, RenderContext, TemplateRenderer};
use crate::error::SyncError;
use crate::report::ReportBuilder;

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchroniseReport {
    pub groups: usize,
    pub types: usize,
    pub ungrouped_types: usize,
    pub rendered_bytes: usize,
}

pub async fn synchronise<S, R, P>(
    config: &SyncConfig,
    source: &S,
    renderer: &R,
    publisher: &P,
) -> Result<SynchroniseReport, SyncError>
where
    S: RelationalSource + ?Sized,
    R: TemplateRenderer + ?Sized,
    P: Publisher + ?Sized,
{
    info!(locator_kind = %config.locator_kind, "[SYNC] Building CI type groups report");
    let groups = ReportBuilder::new(source, config.locator_kind.clone())
        .build_report()
        .await
        .map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Failed to build report");
            SyncError::Source(e)
        })?;

    let group_count = groups.len() - 1;
    let types: usize = groups.iter().map(|g| g.types.len()).sum();
    let ungrouped_types = groups
        .last()
        .filter(|g| g.is_ungrouped())
        .map_or(0, |g| g.types.len());
    info!(
        groups = group_count,
        types,
        ungrouped_types,
        "[SYNC] Report built"
    );

    let context = RenderContext {
        mvn_prefix: config.mvn_prefix.clone(),
        groups,
    };
    let rendered = renderer.render(&context).map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Failed to render page template");
        SyncError::Render(e)
    })?;
    info!(bytes = rendered.len(), "[SYNC] Page rendered");

    publisher.save(&rendered).await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Failed to save rendered page");
        e
    })?;
    info!("[SYNC] Rendered page saved");

    Ok(SynchroniseReport {
        groups: group_count,
        types,
        ungrouped_types,
        rendered_bytes: rendered.len(),
    })
}
