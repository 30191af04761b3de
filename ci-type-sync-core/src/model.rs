//! Records read from the delivery database and the render-ready report built from them.

use serde::{Deserialize, Serialize};

/// A CI type: one classification code with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub code: String,
    pub name: String,
    /// Two-valued code as stored in the database; `"Y"` means standard.
    pub is_standard: String,
    pub is_deliverable: bool,
    /// Primary key in the delivery database, when the record was read from one.
    #[serde(default, skip_serializing)]
    pub row_id: Option<i64>,
}

/// A CI type group: a named bucket of CI types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing)]
    pub row_id: Option<i64>,
}

/// Link between one group and one CI type, carrying the linked CI type's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inclusion {
    pub group_code: String,
    pub member: Member,
}

/// A regular expression attached to a CI type, scoped to a locator kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub member_code: String,
    pub locator_kind: String,
    #[serde(default)]
    pub pattern: Option<String>,
}

/// One table row describing a CI type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRow {
    pub code: String,
    pub name: String,
    #[serde(rename = "standard")]
    pub standard_label: String,
    #[serde(rename = "deliverable")]
    pub deliverable_label: String,
    #[serde(rename = "regexp")]
    pub patterns: Vec<String>,
    #[serde(rename = "rowspan")]
    pub row_span: usize,
}

/// A group block of the table: the group cells span `row_span` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRow {
    pub code: String,
    pub name: String,
    pub types: Vec<TypeRow>,
    #[serde(rename = "rowspan")]
    pub row_span: usize,
}

impl GroupRow {
    /// True for the trailing bucket holding CI types without any group.
    pub fn is_ungrouped(&self) -> bool {
        self.code.is_empty() && self.name.is_empty()
    }
}

/// All group blocks in source order, the ungrouped bucket last.
pub type Report = Vec<GroupRow>;

/// Label used for both boolean columns of the table.
pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}
