//! Bottom-up score aggregation.
//!
//! # Responsibility
//! - Turn a tool hierarchy plus stored responses into a `ScoreReport`.
//!
//! # Invariants
//! - Category score = yes / (yes + no) * 100; `na` is excluded from both.
//! - A category without any yes/no answer scores `None`, never `0`.
//! - Domain and tool scores are means over defined child scores only;
//!   a parent whose children are all `None` is itself `None`.
//! - Unanswered criteria do not count toward any score.

use crate::model::assessment::{AssessmentId, AssessmentStatus};
use crate::model::catalog::{CategoryId, CriterionId, DomainId, ToolId, ToolTree};
use crate::model::response::{AssessmentResponse, ResponseValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Computed score hierarchy consumed by report renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub assessment_id: AssessmentId,
    pub status: AssessmentStatus,
    pub tool_id: ToolId,
    pub tool_name: String,
    /// Mean of defined domain scores, as a percentage.
    pub tool_score: Option<f64>,
    pub domains: Vec<DomainScore>,
    pub categories: Vec<CategoryScore>,
    pub criteria: Vec<CriterionResult>,
    /// Criteria with a stored response.
    pub answered: usize,
    /// All criteria of the tool.
    pub total_criteria: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain_id: DomainId,
    pub name: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category_id: CategoryId,
    pub domain_id: DomainId,
    pub name: String,
    pub yes: u32,
    pub no: u32,
    pub na: u32,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionResult {
    pub criterion_id: CriterionId,
    pub category_id: CategoryId,
    pub text: String,
    /// `None` when the criterion has not been answered.
    pub response: Option<ResponseValue>,
    pub note: Option<String>,
}

/// Percentage of `yes` among yes/no answers; `None` when there are none.
pub fn category_percentage(yes: u32, no: u32) -> Option<f64> {
    let decided = yes + no;
    if decided == 0 {
        return None;
    }
    Some(f64::from(yes) * 100.0 / f64::from(decided))
}

/// Mean of the defined values; `None` when no value is defined.
pub fn mean_defined(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0_f64, 0u32), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        return None;
    }
    Some(sum / f64::from(count))
}

/// Rounds a percentage to two decimals for display (66.666.. -> 66.67).
pub fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregates responses over the tool hierarchy.
///
/// Responses for criteria outside `tree` are ignored.
pub fn compute_report(
    assessment_id: AssessmentId,
    status: AssessmentStatus,
    tree: &ToolTree,
    responses: &[AssessmentResponse],
) -> ScoreReport {
    let by_criterion: HashMap<CriterionId, &AssessmentResponse> = responses
        .iter()
        .map(|response| (response.criterion_id, response))
        .collect();

    let mut domains = Vec::with_capacity(tree.domains.len());
    let mut categories = Vec::new();
    let mut criteria = Vec::with_capacity(tree.criterion_count());
    let mut answered = 0usize;

    for domain in &tree.domains {
        let mut category_scores = Vec::with_capacity(domain.categories.len());

        for category in &domain.categories {
            let (mut yes, mut no, mut na) = (0u32, 0u32, 0u32);

            for criterion in &category.criteria {
                let stored = by_criterion.get(&criterion.id);
                match stored.map(|response| response.response) {
                    Some(ResponseValue::Yes) => yes += 1,
                    Some(ResponseValue::No) => no += 1,
                    Some(ResponseValue::Na) => na += 1,
                    None => {}
                }
                if stored.is_some() {
                    answered += 1;
                }
                criteria.push(CriterionResult {
                    criterion_id: criterion.id,
                    category_id: category.id,
                    text: criterion.text.clone(),
                    response: stored.map(|response| response.response),
                    note: stored.and_then(|response| response.note.clone()),
                });
            }

            let score = category_percentage(yes, no);
            category_scores.push(score);
            categories.push(CategoryScore {
                category_id: category.id,
                domain_id: domain.id,
                name: category.name.clone(),
                yes,
                no,
                na,
                score,
            });
        }

        domains.push(DomainScore {
            domain_id: domain.id,
            name: domain.name.clone(),
            score: mean_defined(category_scores),
        });
    }

    let tool_score = mean_defined(domains.iter().map(|domain| domain.score));

    ScoreReport {
        assessment_id,
        status,
        tool_id: tree.tool.id,
        tool_name: tree.tool.name.clone(),
        tool_score,
        domains,
        categories,
        total_criteria: criteria.len(),
        criteria,
        answered,
    }
}
