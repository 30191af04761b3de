//! [`RelationalSource`] over in-memory collections.
//!
//! Used for offline rendering from a snapshot document and as the fixture source in
//! tests. Collections keep insertion order, which stands in for the database order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::contract::RelationalSource;
use crate::error::SourceError;
use crate::model::{Group, Inclusion, Member, PatternRule};

/// Inclusion record as stored in a snapshot: group code and CI type code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionLink {
    pub group: String,
    pub member: String,
}

impl InclusionLink {
    pub fn new(group: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            member: member.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemorySource {
    #[serde(default)]
    pub locator_kinds: Vec<String>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub inclusions: Vec<InclusionLink>,
    #[serde(default)]
    pub pattern_rules: Vec<PatternRule>,
}

impl InMemorySource {
    fn member(&self, code: &str) -> Result<&Member, SourceError> {
        self.members
            .iter()
            .find(|m| m.code == code)
            .ok_or_else(|| SourceError::DanglingReference {
                kind: "CI type",
                code: code.to_string(),
            })
    }

    fn resolve(&self, link: &InclusionLink) -> Result<Inclusion, SourceError> {
        if !self.groups.iter().any(|g| g.code == link.group) {
            return Err(SourceError::DanglingReference {
                kind: "group",
                code: link.group.clone(),
            });
        }
        Ok(Inclusion {
            group_code: link.group.clone(),
            member: self.member(&link.member)?.clone(),
        })
    }
}

#[async_trait]
impl RelationalSource for InMemorySource {
    async fn groups(&self) -> Result<Vec<Group>, SourceError> {
        Ok(self.groups.clone())
    }

    async fn members(&self) -> Result<Vec<Member>, SourceError> {
        Ok(self.members.clone())
    }

    async fn inclusions_by_group(&self, group: &Group) -> Result<Vec<Inclusion>, SourceError> {
        self.inclusions
            .iter()
            .filter(|link| link.group == group.code)
            .map(|link| self.resolve(link))
            .collect()
    }

    async fn inclusions_by_member(&self, member: &Member) -> Result<Vec<Inclusion>, SourceError> {
        self.inclusions
            .iter()
            .filter(|link| link.member == member.code)
            .map(|link| self.resolve(link))
            .collect()
    }

    async fn pattern_rules(
        &self,
        locator_kind: &str,
        member: &Member,
    ) -> Result<Vec<PatternRule>, SourceError> {
        if !self.locator_kinds.iter().any(|k| k == locator_kind) {
            return Err(SourceError::UnknownLocatorKind(locator_kind.to_string()));
        }
        Ok(self
            .pattern_rules
            .iter()
            .filter(|rule| rule.locator_kind == locator_kind && rule.member_code == member.code)
            .cloned()
            .collect())
    }
}
