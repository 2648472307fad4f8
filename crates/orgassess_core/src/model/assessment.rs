//! Assessment, owner and guest session model.
//!
//! # Responsibility
//! - Define one run of a tool by one owner and its lifecycle state.
//! - Define guest sessions used to resume assessments without an account.
//!
//! # Invariants
//! - `id` is stable and never reused for another assessment.
//! - Status only moves forward: `InProgress -> Draft` (save and exit),
//!   `InProgress | Draft -> Submitted`. `Submitted` is terminal.
//! - An assessment is owned by a user or a guest session, never both.

use crate::model::catalog::ToolId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

const GUEST_DETAIL_MAX_CHARS: usize = 255;

/// Stable identifier for one assessment.
pub type AssessmentId = Uuid;

/// Assessment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    /// Saved and exited; can be resumed.
    Draft,
    /// Actively being answered.
    InProgress,
    /// Closed; responses are frozen.
    Submitted,
}

impl AssessmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "in_progress" => Some(Self::InProgress),
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }

    /// Whether response writes are still accepted.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Submitted)
    }
}

/// Owner of an assessment, supplied by the caller's identity source.
///
/// Treated as an opaque equality-comparable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerRef {
    /// Registered, authenticated user id.
    User(String),
    /// Anonymous browser session token.
    Guest(String),
}

impl OwnerRef {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    pub fn guest(session_token: impl Into<String>) -> Self {
        Self::Guest(session_token.into())
    }

    /// Owner kind label used in logs and storage (`user|guest`).
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Guest(_) => "guest",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::User(id) | Self::Guest(id) => id.as_str(),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

impl Display for OwnerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind_label(), self.key())
    }
}

/// One evaluation run of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub tool_id: ToolId,
    pub owner: OwnerRef,
    pub status: AssessmentStatus,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
    /// Epoch ms, set once on submit.
    pub submitted_at: Option<i64>,
}

impl Assessment {
    /// Creates a new in-progress assessment with a generated id.
    ///
    /// Timestamps are placeholders until storage stamps them.
    pub fn start(tool_id: ToolId, owner: OwnerRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool_id,
            owner,
            status: AssessmentStatus::InProgress,
            created_at: 0,
            updated_at: 0,
            submitted_at: None,
        }
    }
}

/// Anonymous session that can resume its latest assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestSession {
    pub session_token: String,
    pub details: GuestDetails,
    pub assessment_id: Option<AssessmentId>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Optional contact details a guest can attach to its session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
}

/// Validation failures for guest contact details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestDetailsValidationError {
    InvalidEmail(String),
    FieldTooLong(&'static str),
    EmptySessionToken,
}

impl Display for GuestDetailsValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::FieldTooLong(field) => write!(
                f,
                "{field} must be at most {GUEST_DETAIL_MAX_CHARS} characters"
            ),
            Self::EmptySessionToken => write!(f, "guest session token must not be blank"),
        }
    }
}

impl Error for GuestDetailsValidationError {}

impl GuestDetails {
    /// Trims fields, drops blanks, and validates email shape and lengths.
    pub fn normalized(&self) -> Result<Self, GuestDetailsValidationError> {
        let name = normalize_field(self.name.as_deref(), "name")?;
        let organization = normalize_field(self.organization.as_deref(), "organization")?;
        let email = normalize_field(self.email.as_deref(), "email")?;
        if let Some(email) = email.as_deref() {
            if !EMAIL_RE.is_match(email) {
                return Err(GuestDetailsValidationError::InvalidEmail(email.to_string()));
            }
        }

        Ok(Self {
            name,
            email,
            organization,
        })
    }
}

/// Rejects blank guest session tokens.
pub fn validate_session_token(token: &str) -> Result<(), GuestDetailsValidationError> {
    if token.trim().is_empty() {
        return Err(GuestDetailsValidationError::EmptySessionToken);
    }
    Ok(())
}

fn normalize_field(
    value: Option<&str>,
    field: &'static str,
) -> Result<Option<String>, GuestDetailsValidationError> {
    let Some(trimmed) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > GUEST_DETAIL_MAX_CHARS {
        return Err(GuestDetailsValidationError::FieldTooLong(field));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{
        validate_session_token, Assessment, AssessmentStatus, GuestDetails,
        GuestDetailsValidationError, OwnerRef,
    };

    #[test]
    fn start_creates_in_progress_assessment() {
        let assessment = Assessment::start(7, OwnerRef::user("u-1"));
        assert_eq!(assessment.status, AssessmentStatus::InProgress);
        assert_eq!(assessment.tool_id, 7);
        assert!(assessment.submitted_at.is_none());
        assert_eq!(assessment.owner, OwnerRef::user("u-1"));
    }

    #[test]
    fn user_and_guest_with_same_key_are_different_owners() {
        assert_ne!(OwnerRef::user("abc"), OwnerRef::guest("abc"));
    }

    #[test]
    fn status_strings_parse_back() {
        for status in [
            AssessmentStatus::Draft,
            AssessmentStatus::InProgress,
            AssessmentStatus::Submitted,
        ] {
            assert_eq!(AssessmentStatus::parse(status.as_str()), Some(status));
        }
        assert!(!AssessmentStatus::Submitted.is_open());
        assert!(AssessmentStatus::Draft.is_open());
    }

    #[test]
    fn guest_details_normalize_and_validate_email() {
        let details = GuestDetails {
            name: Some("  Dana ".to_string()),
            email: Some(" dana@example.org ".to_string()),
            organization: Some("   ".to_string()),
        };
        let normalized = details.normalized().expect("valid details");
        assert_eq!(normalized.name.as_deref(), Some("Dana"));
        assert_eq!(normalized.email.as_deref(), Some("dana@example.org"));
        assert_eq!(normalized.organization, None);

        let bad = GuestDetails {
            email: Some("not-an-email".to_string()),
            ..GuestDetails::default()
        };
        assert!(matches!(
            bad.normalized(),
            Err(GuestDetailsValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn blank_session_token_is_rejected() {
        assert_eq!(
            validate_session_token("  "),
            Err(GuestDetailsValidationError::EmptySessionToken)
        );
        assert!(validate_session_token("tok-1").is_ok());
    }

    #[test]
    fn owner_serializes_with_kind_tag() {
        let json = serde_json::to_string(&OwnerRef::guest("s-1")).expect("serialize owner");
        assert_eq!(json, r#"{"kind":"guest","id":"s-1"}"#);
    }
}
