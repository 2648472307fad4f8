//! Criterion response model and wire encoding.
//!
//! # Responsibility
//! - Define the canonical yes/no/na answer.
//! - Map the integer wire encoding (`100`/`0`/`50`) to canonical answers.
//!
//! # Invariants
//! - `encode(decode(x)) == x` for `x` in `{100, 0, 50}`.
//! - Unknown integers decode to `Na` instead of being rejected.

use crate::model::assessment::AssessmentId;
use crate::model::catalog::CriterionId;
use serde::{Deserialize, Serialize};

/// Wire value for `ResponseValue::Yes`.
pub const RAW_YES: i64 = 100;
/// Wire value for `ResponseValue::No`.
pub const RAW_NO: i64 = 0;
/// Wire value for `ResponseValue::Na`.
pub const RAW_NA: i64 = 50;

/// Canonical answer to one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseValue {
    Yes,
    No,
    /// Not applicable; excluded from score denominators.
    Na,
}

impl ResponseValue {
    /// Decodes the integer wire value.
    ///
    /// Any value outside `{100, 0, 50}` falls back to `Na` so lenient client
    /// input is stored rather than rejected.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            RAW_YES => Self::Yes,
            RAW_NO => Self::No,
            RAW_NA => Self::Na,
            _ => Self::Na,
        }
    }

    /// Encodes to the integer wire value.
    pub fn to_raw(self) -> i64 {
        match self {
            Self::Yes => RAW_YES,
            Self::No => RAW_NO,
            Self::Na => RAW_NA,
        }
    }

    /// Stable storage/label string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Na => "na",
        }
    }

    /// Parses the storage string; `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "na" => Some(Self::Na),
            _ => None,
        }
    }
}

/// Stored answer for one criterion within one assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub assessment_id: AssessmentId,
    pub criterion_id: CriterionId,
    pub response: ResponseValue,
    pub note: Option<String>,
    /// Epoch ms of the last write.
    pub updated_at: i64,
}

/// Normalizes free-text notes: trims and maps blank input to `None`.
pub fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}
