//! Assessment session manager.
//!
//! # Responsibility
//! - Start assessments for users or guest sessions.
//! - Record per-criterion responses with upsert semantics.
//! - Drive the draft/in_progress/submitted lifecycle.
//! - Compute score reports.
//!
//! # Invariants
//! - Every operation takes the acting owner explicitly; nothing is read from
//!   ambient request state.
//! - Ownership is checked through `AuthorizationPort` before any write.
//! - Submitted assessments reject response writes with `AssessmentClosed`.
//! - Batched save-and-exit commits item by item; a failure keeps earlier items.
//! - Failures are returned, never logged here; only successful transitions
//!   emit metadata-only log events.

use crate::auth::capability::{Action, Permission, ResourceKind};
use crate::auth::policy::{AuthorizationPort, ResourceRef};
use crate::model::assessment::{
    validate_session_token, Assessment, AssessmentId, AssessmentStatus, GuestDetails,
    GuestDetailsValidationError, GuestSession, OwnerRef,
};
use crate::model::catalog::{CriterionId, Tool, ToolId};
use crate::model::response::{normalize_note, AssessmentResponse, ResponseValue};
use crate::repo::assessment_repo::AssessmentRepository;
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::RepoError;
use crate::service::scoring::{compute_report, ScoreReport};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, AssessmentServiceError>;

/// Coarse failure class used by outer interfaces to pick a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    Validation,
    Storage,
}

/// Errors from session manager operations.
#[derive(Debug)]
pub enum AssessmentServiceError {
    ToolNotFound(ToolId),
    AssessmentNotFound(AssessmentId),
    /// Criterion is unknown or belongs to another tool.
    CriterionNotFound(CriterionId),
    Forbidden {
        actor: OwnerRef,
        permission: Permission,
    },
    /// Assessment is submitted and no longer accepts writes.
    AssessmentClosed(AssessmentId),
    InvalidGuestDetails(GuestDetailsValidationError),
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl AssessmentServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ToolNotFound(_) | Self::AssessmentNotFound(_) | Self::CriterionNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::AssessmentClosed(_) => ErrorKind::Conflict,
            Self::InvalidGuestDetails(_) => ErrorKind::Validation,
            Self::Repo(_) | Self::InconsistentState(_) => ErrorKind::Storage,
        }
    }
}

impl Display for AssessmentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToolNotFound(id) => write!(f, "tool not found: {id}"),
            Self::AssessmentNotFound(id) => write!(f, "assessment not found: {id}"),
            Self::CriterionNotFound(id) => write!(f, "criterion not found: {id}"),
            Self::Forbidden { actor, permission } => {
                write!(f, "{actor} is not allowed to {permission}")
            }
            Self::AssessmentClosed(id) => {
                write!(f, "assessment {id} is submitted and can no longer be changed")
            }
            Self::InvalidGuestDetails(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent assessment state: {details}")
            }
        }
    }
}

impl Error for AssessmentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidGuestDetails(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AssessmentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ToolNotFound(id) => Self::ToolNotFound(id),
            RepoError::AssessmentNotFound(id) => Self::AssessmentNotFound(id),
            RepoError::AssessmentClosed(id) => Self::AssessmentClosed(id),
            other => Self::Repo(other),
        }
    }
}

impl From<GuestDetailsValidationError> for AssessmentServiceError {
    fn from(value: GuestDetailsValidationError) -> Self {
        Self::InvalidGuestDetails(value)
    }
}

/// One entry of a save-and-exit form post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResponse {
    pub criterion_id: CriterionId,
    /// Integer wire value; `None` entries are skipped.
    pub raw_value: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Result of a batched save-and-exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveExitOutcome {
    pub recorded: usize,
    pub skipped: usize,
    pub status: AssessmentStatus,
}

/// Session manager over catalog, assessment storage and authorization.
pub struct AssessmentService<C, A, P>
where
    C: CatalogRepository,
    A: AssessmentRepository,
    P: AuthorizationPort,
{
    catalog: C,
    assessments: A,
    policy: P,
}

impl<C, A, P> AssessmentService<C, A, P>
where
    C: CatalogRepository,
    A: AssessmentRepository,
    P: AuthorizationPort,
{
    pub fn new(catalog: C, assessments: A, policy: P) -> Self {
        Self {
            catalog,
            assessments,
            policy,
        }
    }

    /// Lists the tools an owner can start.
    pub fn list_tools(&self) -> ServiceResult<Vec<Tool>> {
        Ok(self.catalog.list_tools()?)
    }

    /// Starts a new in-progress assessment of `tool_id` for `owner`.
    ///
    /// Guest owners get their session created (if needed) and pointed at the
    /// new assessment so it can be resumed.
    pub fn start_assessment(&self, tool_id: ToolId, owner: &OwnerRef) -> ServiceResult<Assessment> {
        if let OwnerRef::Guest(token) = owner {
            validate_session_token(token)?;
        }
        self.authorize(owner, Action::Create, ResourceRef::unowned(ResourceKind::Assessment))?;

        if self.catalog.get_tool(tool_id)?.is_none() {
            return Err(AssessmentServiceError::ToolNotFound(tool_id));
        }

        let assessment = Assessment::start(tool_id, owner.clone());
        let assessment_id = self.assessments.create_assessment(&assessment)?;
        if let OwnerRef::Guest(token) = owner {
            self.assessments.attach_guest_session(token, assessment_id)?;
        }

        let stored = self
            .assessments
            .get_assessment(assessment_id)?
            .ok_or(AssessmentServiceError::InconsistentState(
                "started assessment not found in read-back",
            ))?;

        info!(
            "event=assessment_start module=service status=ok assessment_id={} tool_id={} owner_kind={}",
            stored.id,
            tool_id,
            owner.kind_label()
        );
        Ok(stored)
    }

    /// Records one answer, decoding the integer wire value.
    ///
    /// Returns the canonical value that was stored. Unknown integers are
    /// stored as `Na`.
    pub fn record_response(
        &self,
        actor: &OwnerRef,
        assessment_id: AssessmentId,
        criterion_id: CriterionId,
        raw_value: i64,
        note: Option<&str>,
    ) -> ServiceResult<ResponseValue> {
        let assessment = self.load_authorized(actor, Action::Update, assessment_id)?;
        if !assessment.status.is_open() {
            return Err(AssessmentServiceError::AssessmentClosed(assessment_id));
        }

        match self.catalog.get_criterion(criterion_id)? {
            Some(criterion) if criterion.tool_id == assessment.tool_id => {}
            _ => return Err(AssessmentServiceError::CriterionNotFound(criterion_id)),
        }

        let response = ResponseValue::from_raw(raw_value);
        let note = normalize_note(note);
        self.assessments
            .upsert_response(assessment_id, criterion_id, response, note.as_deref())?;

        Ok(response)
    }

    /// Moves an in-progress assessment to draft. No-op for any other status.
    ///
    /// Returns the status after the call.
    pub fn save_and_exit(
        &self,
        actor: &OwnerRef,
        assessment_id: AssessmentId,
    ) -> ServiceResult<AssessmentStatus> {
        let assessment = self.load_authorized(actor, Action::Update, assessment_id)?;
        let changed = self.assessments.transition_status(
            assessment_id,
            &[AssessmentStatus::InProgress],
            AssessmentStatus::Draft,
        )?;

        if !changed {
            return Ok(assessment.status);
        }

        info!(
            "event=assessment_save_exit module=service status=ok assessment_id={}",
            assessment_id
        );
        Ok(AssessmentStatus::Draft)
    }

    /// Records pending form entries one by one, then saves and exits.
    ///
    /// Each entry commits independently. The first failing entry aborts the
    /// batch and is returned; entries before it stay persisted.
    pub fn save_and_exit_with_responses(
        &self,
        actor: &OwnerRef,
        assessment_id: AssessmentId,
        entries: &[PendingResponse],
    ) -> ServiceResult<SaveExitOutcome> {
        self.load_authorized(actor, Action::Update, assessment_id)?;

        let mut recorded = 0usize;
        let mut skipped = 0usize;
        for entry in entries {
            let Some(raw_value) = entry.raw_value else {
                skipped += 1;
                continue;
            };
            self.record_response(
                actor,
                assessment_id,
                entry.criterion_id,
                raw_value,
                entry.note.as_deref(),
            )?;
            recorded += 1;
        }

        let status = self.save_and_exit(actor, assessment_id)?;
        Ok(SaveExitOutcome {
            recorded,
            skipped,
            status,
        })
    }

    /// Closes the assessment. Submitting twice is a conflict.
    pub fn submit(
        &self,
        actor: &OwnerRef,
        assessment_id: AssessmentId,
    ) -> ServiceResult<Assessment> {
        let assessment = self.load_authorized(actor, Action::Update, assessment_id)?;
        if !assessment.status.is_open() {
            return Err(AssessmentServiceError::AssessmentClosed(assessment_id));
        }

        let changed = self.assessments.transition_status(
            assessment_id,
            &[AssessmentStatus::Draft, AssessmentStatus::InProgress],
            AssessmentStatus::Submitted,
        )?;

        let stored = self
            .assessments
            .get_assessment(assessment_id)?
            .ok_or(AssessmentServiceError::AssessmentNotFound(assessment_id))?;
        if !changed {
            // Lost a race against another submit.
            return Err(AssessmentServiceError::AssessmentClosed(assessment_id));
        }

        info!(
            "event=assessment_submit module=service status=ok assessment_id={} tool_id={}",
            assessment_id, stored.tool_id
        );
        Ok(stored)
    }

    /// Computes the category/domain/tool score hierarchy.
    pub fn compute_score(
        &self,
        actor: &OwnerRef,
        assessment_id: AssessmentId,
    ) -> ServiceResult<ScoreReport> {
        let assessment = self.load_authorized(actor, Action::View, assessment_id)?;
        let tree = self
            .catalog
            .load_tool_tree(assessment.tool_id)?
            .ok_or(AssessmentServiceError::ToolNotFound(assessment.tool_id))?;
        let responses = self.assessments.list_responses(assessment_id)?;
        Ok(compute_report(
            assessment_id,
            assessment.status,
            &tree,
            &responses,
        ))
    }

    /// Loads one assessment visible to `actor`.
    pub fn get_assessment(
        &self,
        actor: &OwnerRef,
        assessment_id: AssessmentId,
    ) -> ServiceResult<Assessment> {
        self.load_authorized(actor, Action::View, assessment_id)
    }

    /// Lists the actor's own assessments, newest first.
    pub fn list_assessments(&self, actor: &OwnerRef) -> ServiceResult<Vec<Assessment>> {
        Ok(self.assessments.list_assessments(actor)?)
    }

    /// Lists stored responses of one assessment.
    pub fn list_responses(
        &self,
        actor: &OwnerRef,
        assessment_id: AssessmentId,
    ) -> ServiceResult<Vec<AssessmentResponse>> {
        self.load_authorized(actor, Action::View, assessment_id)?;
        Ok(self.assessments.list_responses(assessment_id)?)
    }

    /// Returns the assessment a guest session last worked on.
    pub fn resume_guest_assessment(
        &self,
        session_token: &str,
    ) -> ServiceResult<Option<Assessment>> {
        validate_session_token(session_token)?;
        let Some(session) = self.assessments.get_guest_session(session_token)? else {
            return Ok(None);
        };
        let Some(assessment_id) = session.assessment_id else {
            return Ok(None);
        };

        let actor = OwnerRef::guest(session_token);
        match self.load_authorized(&actor, Action::View, assessment_id) {
            Ok(assessment) => Ok(Some(assessment)),
            Err(AssessmentServiceError::AssessmentNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Replaces a guest session's contact details.
    pub fn update_guest_details(
        &self,
        session_token: &str,
        details: &GuestDetails,
    ) -> ServiceResult<GuestSession> {
        validate_session_token(session_token)?;
        let normalized = details.normalized()?;
        self.assessments
            .save_guest_details(session_token, &normalized)?;
        let session = self
            .assessments
            .get_guest_session(session_token)?
            .ok_or(AssessmentServiceError::InconsistentState(
                "guest session not found in read-back",
            ))?;

        info!("event=guest_details_update module=service status=ok");
        Ok(session)
    }

    fn load_authorized(
        &self,
        actor: &OwnerRef,
        action: Action,
        assessment_id: AssessmentId,
    ) -> ServiceResult<Assessment> {
        let assessment = self
            .assessments
            .get_assessment(assessment_id)?
            .ok_or(AssessmentServiceError::AssessmentNotFound(assessment_id))?;
        self.authorize(
            actor,
            action,
            ResourceRef::owned(ResourceKind::Assessment, &assessment.owner),
        )?;
        Ok(assessment)
    }

    fn authorize(
        &self,
        actor: &OwnerRef,
        action: Action,
        resource: ResourceRef<'_>,
    ) -> ServiceResult<()> {
        if self.policy.can(actor, action, resource) {
            return Ok(());
        }
        Err(AssessmentServiceError::Forbidden {
            actor: actor.clone(),
            permission: Permission::new(action, resource.kind),
        })
    }
}
