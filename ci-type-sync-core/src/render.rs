//! Handlebars rendering of the report into Confluence storage format.
//!
//! Templates see the [`RenderContext`] as `mvn_prefix` and `groups`; each group exposes
//! `code`, `name`, `rowspan` and `types`, each type `code`, `name`, `standard`,
//! `deliverable`, `regexp` and `rowspan`. Values are HTML-escaped unless the template
//! uses triple braces.

use std::path::Path;

use handlebars::Handlebars;
use tracing::{debug, error, info};

use crate::contract::{RenderContext, TemplateRenderer};
use crate::error::BoxError;

const TEMPLATE_NAME: &str = "page";

/// Storage-format table shipped with the crate.
pub const BUILTIN_TEMPLATE: &str = include_str!("../templates/ci-type-groups-and-ci-types.xhtml.hbs");

pub struct HandlebarsRenderer {
    handlebars: Handlebars<'static>,
}

impl HandlebarsRenderer {
    /// Renderer for the built-in template.
    pub fn builtin() -> Result<Self, BoxError> {
        Self::from_template_str(BUILTIN_TEMPLATE)
    }

    pub fn from_template_str(template: &str) -> Result<Self, BoxError> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| {
                error!(error = %e, "Failed to compile page template");
                Box::new(e) as BoxError
            })?;
        Ok(Self { handlebars })
    }

    pub fn from_file(path: &Path) -> Result<Self, BoxError> {
        info!(template = %path.display(), "Loading page template");
        let template = std::fs::read_to_string(path).map_err(|e| {
            error!(error = ?e, template = %path.display(), "Failed to read page template");
            format!("failed to read template {}: {e}", path.display())
        })?;
        Self::from_template_str(&template)
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, context: &RenderContext) -> Result<String, BoxError> {
        debug!(groups = context.groups.len(), "Rendering page template");
        let rendered = self.handlebars.render(TEMPLATE_NAME, context)?;
        Ok(rendered)
    }
}
