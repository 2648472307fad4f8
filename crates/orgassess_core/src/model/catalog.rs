//! Catalog hierarchy: tools, domains, categories and criteria.
//!
//! # Invariants
//! - Children are kept in catalog order (`sort_order ASC, id ASC`).
//! - A criterion belongs to exactly one category, which belongs to exactly
//!   one domain, which belongs to exactly one tool.

use serde::{Deserialize, Serialize};

pub type ToolId = i64;
pub type DomainId = i64;
pub type CategoryId = i64;
pub type CriterionId = i64;

/// Tool header without its hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub id: ToolId,
    pub name: String,
    pub description: Option<String>,
}

/// Criterion lookup result with its owning category and tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionRef {
    pub id: CriterionId,
    pub category_id: CategoryId,
    pub tool_id: ToolId,
}

/// One answerable yes/no/na question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    pub text: String,
}

/// Ordered group of criteria; the unit of score aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub criteria: Vec<Criterion>,
}

/// Ordered group of categories within one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub categories: Vec<Category>,
}

/// Fully loaded tool hierarchy used by scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolTree {
    pub tool: Tool,
    pub domains: Vec<Domain>,
}

impl ToolTree {
    /// Iterates every criterion in catalog order together with its category id.
    pub fn criteria(&self) -> impl Iterator<Item = (CategoryId, &Criterion)> {
        self.domains.iter().flat_map(|domain| {
            domain.categories.iter().flat_map(|category| {
                category
                    .criteria
                    .iter()
                    .map(move |criterion| (category.id, criterion))
            })
        })
    }

    /// Total number of criteria across all domains.
    pub fn criterion_count(&self) -> usize {
        self.criteria().count()
    }
}

/// Import document used to seed the catalog store.
///
/// Ids are assigned by storage; order in the document becomes `sort_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogImport {
    pub tools: Vec<ToolImport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolImport {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub domains: Vec<DomainImport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainImport {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<CategoryImport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryImport {
    pub name: String,
    #[serde(default)]
    pub criteria: Vec<String>,
}
