//! Builds the render-ready report from the four record collections.
//!
//! The builder is a pure transformation over whatever the [`RelationalSource`] returns
//! at call time: no caching, no state kept between runs, and source errors are passed
//! through untouched.

use tracing::debug;

use crate::contract::RelationalSource;
use crate::error::SourceError;
use crate::model::{yes_no, GroupRow, Member, Report, TypeRow};

pub struct ReportBuilder<'a, S: RelationalSource + ?Sized> {
    source: &'a S,
    locator_kind: String,
}

impl<'a, S: RelationalSource + ?Sized> ReportBuilder<'a, S> {
    pub fn new(source: &'a S, locator_kind: impl Into<String>) -> Self {
        Self {
            source,
            locator_kind: locator_kind.into(),
        }
    }

    /// Non-empty patterns of `member` for the configured locator kind, in source order.
    pub async fn patterns_for(&self, member: &Member) -> Result<Vec<String>, SourceError> {
        let rules = self
            .source
            .pattern_rules(&self.locator_kind, member)
            .await?;

        let patterns: Vec<String> = rules
            .into_iter()
            .filter_map(|rule| rule.pattern)
            .filter(|pattern| !pattern.is_empty())
            .collect();

        debug!(
            member = %member.code,
            count = patterns.len(),
            "Found patterns for CI type"
        );
        Ok(patterns)
    }

    pub async fn to_type_row(&self, member: &Member) -> Result<TypeRow, SourceError> {
        debug!(member = %member.code, "Processing CI type");
        let row = TypeRow {
            code: member.code.clone(),
            name: member.name.clone(),
            standard_label: yes_no(member.is_standard == "Y").to_string(),
            deliverable_label: yes_no(member.is_deliverable).to_string(),
            patterns: self.patterns_for(member).await?,
            // One row per CI type; patterns are stacked inside a single cell.
            row_span: 1,
        };
        debug!(member = %row.code, row_span = row.row_span, "Rows for CI type");
        Ok(row)
    }

    /// Every group in source order, followed by the ungrouped bucket.
    pub async fn build_report(&self) -> Result<Report, SourceError> {
        let mut report = Report::new();

        for group in self.source.groups().await? {
            let mut types = Vec::new();
            for inclusion in self.source.inclusions_by_group(&group).await? {
                types.push(self.to_type_row(&inclusion.member).await?);
            }
            let row_span = row_span_of(&types);
            debug!(group = %group.code, row_span, "Counted group rows");
            report.push(GroupRow {
                code: group.code,
                name: group.name,
                types,
                row_span,
            });
        }

        let mut ungrouped = Vec::new();
        for member in self.source.members().await? {
            if !self.source.inclusions_by_member(&member).await?.is_empty() {
                continue;
            }
            ungrouped.push(self.to_type_row(&member).await?);
        }
        let row_span = row_span_of(&ungrouped);
        debug!(row_span, "Counted ungrouped rows");
        report.push(GroupRow {
            code: String::new(),
            name: String::new(),
            types: ungrouped,
            row_span,
        });

        Ok(report)
    }
}

/// Table rows a group block occupies; an empty group still takes one row.
pub fn row_span_of(types: &[TypeRow]) -> usize {
    if types.is_empty() {
        return 1;
    }
    types.iter().map(|t| t.row_span).sum()
}
