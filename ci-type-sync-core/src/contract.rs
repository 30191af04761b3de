//! # contract: the seams of the synchronisation pipeline
//!
//! Three traits separate the pipeline from its collaborators:
//! - [`RelationalSource`]: read-only access to the four record collections of the
//!   delivery database (groups, CI types, inclusions, pattern rules).
//! - [`TemplateRenderer`]: turns a [`RenderContext`] into page markup.
//! - [`Publisher`]: delivers the rendered markup (local file or Confluence page).
//!
//! ## Mocking & Testing
//! - Each trait is annotated for `mockall`, so tests and downstream crates (with the
//!   `test-export-mocks` feature) get `MockRelationalSource`, `MockTemplateRenderer`
//!   and `MockPublisher`.
//!
//! ## Ordering
//! Every collection query returns records in the source's own order. Callers rely on
//! that order and never re-sort.

use async_trait::async_trait;
use serde::Serialize;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{BoxError, SourceError, SyncError};
use crate::model::{Group, Inclusion, Member, PatternRule, Report};

/// Read-only view over the delivery database.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RelationalSource: Send + Sync {
    /// All groups.
    async fn groups(&self) -> Result<Vec<Group>, SourceError>;

    /// All CI types.
    async fn members(&self) -> Result<Vec<Member>, SourceError>;

    /// Inclusions linking CI types into `group`, with the linked CI type attached.
    async fn inclusions_by_group(&self, group: &Group) -> Result<Vec<Inclusion>, SourceError>;

    /// Inclusions linking `member` into any group.
    async fn inclusions_by_member(&self, member: &Member) -> Result<Vec<Inclusion>, SourceError>;

    /// Pattern rules of `member` for `locator_kind`.
    ///
    /// Fails with [`SourceError::UnknownLocatorKind`] when the locator kind itself is
    /// missing from the source, even if `member` has no rules at all.
    async fn pattern_rules(
        &self,
        locator_kind: &str,
        member: &Member,
    ) -> Result<Vec<PatternRule>, SourceError>;
}

/// Context handed to the template.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    pub mvn_prefix: String,
    pub groups: Report,
}

/// Pure rendering step: context in, markup out.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, context: &RenderContext) -> Result<String, BoxError>;
}

/// Final delivery of the rendered page.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn save(&self, rendered: &str) -> Result<(), SyncError>;
}
