//! Use-case API for outer request handlers.
//!
//! # Responsibility
//! - Expose one function per assessment route.
//! - Map core error kinds onto stable status codes.
//!
//! # Invariants
//! - Exported functions never panic; every failure becomes a `ok=false`
//!   envelope with a message.
//! - The acting owner is always an explicit argument.
//! - Unparseable assessment ids are reported as not found.

use log::error;
use orgassess_core::db::open_db;
use orgassess_core::{
    core_version as core_version_inner, find_report_template, import_catalog, ping as ping_inner,
    report_templates as report_templates_inner, Assessment, AssessmentId, AssessmentService,
    AssessmentServiceError, AssessmentStatus, CatalogImport, CoreConfig, CriterionId, ErrorKind,
    GuestDetails, GuestSession, OwnerRef, OwnershipPolicy, PendingResponse, ReportTemplate,
    ResponseValue, SaveExitOutcome, ScoreReport, ServiceResult, SqliteAssessmentRepository,
    SqliteCatalogRepository, Tool, ToolId,
};
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

type Service<'conn> = AssessmentService<
    SqliteCatalogRepository<'conn>,
    SqliteAssessmentRepository<'conn>,
    OwnershipPolicy,
>;

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_FORBIDDEN: u16 = 403;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_UNPROCESSABLE: u16 = 422;
pub const STATUS_INTERNAL: u16 = 500;

/// Where API calls find their database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiContext {
    db_path: PathBuf,
}

impl ApiContext {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.db_path.clone())
    }
}

/// Response envelope shared by every route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// HTTP-style status code.
    pub status: u16,
    /// Payload on success.
    pub data: Option<T>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
}

impl<T> ApiResponse<T> {
    fn success(status: u16, message: impl Into<String>, data: T) -> Self {
        Self {
            ok: true,
            status,
            data: Some(data),
            message: message.into(),
        }
    }

    fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            data: None,
            message: message.into(),
        }
    }

    /// Converts the envelope into a `Result`, keeping the failure message.
    pub fn into_result(self) -> Result<T, String> {
        match self.data {
            Some(data) if self.ok => Ok(data),
            _ => Err(self.message),
        }
    }
}

/// Canonical answer echoed back after a response write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordedResponse {
    pub criterion_id: CriterionId,
    pub response: ResponseValue,
}

/// Maps an error kind onto the status code outer interfaces report.
pub fn status_for(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::NotFound => STATUS_NOT_FOUND,
        ErrorKind::Forbidden => STATUS_FORBIDDEN,
        ErrorKind::Conflict => STATUS_CONFLICT,
        ErrorKind::Validation => STATUS_UNPROCESSABLE,
        ErrorKind::Storage => STATUS_INTERNAL,
    }
}

/// Health-check probe.
pub fn ping() -> String {
    ping_inner().to_owned()
}

pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Imports catalog tools and returns their new ids in import order.
pub fn catalog_import(ctx: &ApiContext, import: &CatalogImport) -> ApiResponse<Vec<ToolId>> {
    with_connection(ctx, "catalog_import", STATUS_CREATED, |conn| {
        let ids = import_catalog(conn, import)?;
        Ok((format!("Imported {} tool(s).", ids.len()), ids))
    })
}

/// Lists tools available to start.
pub fn tools_index(ctx: &ApiContext) -> ApiResponse<Vec<Tool>> {
    with_service(ctx, "tools_index", STATUS_OK, |service| {
        let tools = service.list_tools()?;
        Ok((format!("Found {} tool(s).", tools.len()), tools))
    })
}

/// Starts an assessment of `tool_id` for `actor`.
pub fn assessment_start(
    ctx: &ApiContext,
    actor: &OwnerRef,
    tool_id: ToolId,
) -> ApiResponse<Assessment> {
    with_service(ctx, "assessment_start", STATUS_CREATED, |service| {
        let assessment = service.start_assessment(tool_id, actor)?;
        Ok(("Assessment started.".to_string(), assessment))
    })
}

/// Records one answer given as an integer wire value.
pub fn assessment_response(
    ctx: &ApiContext,
    actor: &OwnerRef,
    assessment_id: &str,
    criterion_id: CriterionId,
    raw_value: i64,
    note: Option<String>,
) -> ApiResponse<RecordedResponse> {
    with_assessment(ctx, "assessment_response", assessment_id, |service, id| {
        let response =
            service.record_response(actor, id, criterion_id, raw_value, note.as_deref())?;
        Ok((
            "Response saved.".to_string(),
            RecordedResponse {
                criterion_id,
                response,
            },
        ))
    })
}

/// Moves an in-progress assessment to draft.
pub fn assessment_save_exit(
    ctx: &ApiContext,
    actor: &OwnerRef,
    assessment_id: &str,
) -> ApiResponse<AssessmentStatus> {
    with_assessment(ctx, "assessment_save_exit", assessment_id, |service, id| {
        let status = service.save_and_exit(actor, id)?;
        Ok(("Progress saved.".to_string(), status))
    })
}

/// Records pending form entries, then saves and exits.
pub fn assessment_save_and_exit(
    ctx: &ApiContext,
    actor: &OwnerRef,
    assessment_id: &str,
    entries: &[PendingResponse],
) -> ApiResponse<SaveExitOutcome> {
    with_assessment(ctx, "assessment_save_and_exit", assessment_id, |service, id| {
        let outcome = service.save_and_exit_with_responses(actor, id, entries)?;
        Ok((
            format!("Progress saved with {} response(s).", outcome.recorded),
            outcome,
        ))
    })
}

/// Submits an assessment, closing it for writes.
pub fn assessment_submit(
    ctx: &ApiContext,
    actor: &OwnerRef,
    assessment_id: &str,
) -> ApiResponse<Assessment> {
    with_assessment(ctx, "assessment_submit", assessment_id, |service, id| {
        let assessment = service.submit(actor, id)?;
        Ok(("Assessment submitted.".to_string(), assessment))
    })
}

/// Computes the score report of one assessment.
pub fn assessment_results(
    ctx: &ApiContext,
    actor: &OwnerRef,
    assessment_id: &str,
) -> ApiResponse<ScoreReport> {
    with_assessment(ctx, "assessment_results", assessment_id, |service, id| {
        let report = service.compute_score(actor, id)?;
        Ok(("Results computed.".to_string(), report))
    })
}

/// Lists the actor's assessments, newest first.
pub fn assessments_index(ctx: &ApiContext, actor: &OwnerRef) -> ApiResponse<Vec<Assessment>> {
    with_service(ctx, "assessments_index", STATUS_OK, |service| {
        let assessments = service.list_assessments(actor)?;
        Ok((
            format!("Found {} assessment(s).", assessments.len()),
            assessments,
        ))
    })
}

/// Returns the assessment a guest session can resume.
///
/// Sessions with nothing to resume yield 404.
pub fn guest_session_resume(ctx: &ApiContext, session_token: &str) -> ApiResponse<Assessment> {
    let response = with_service(ctx, "guest_session_resume", STATUS_OK, |service| {
        let resumed = service.resume_guest_assessment(session_token)?;
        Ok(("Assessment resumed.".to_string(), resumed))
    });
    match response.data {
        Some(Some(assessment)) => {
            ApiResponse::success(response.status, response.message, assessment)
        }
        Some(None) => ApiResponse::failure(
            STATUS_NOT_FOUND,
            "guest_session_resume failed: no assessment to resume",
        ),
        None => ApiResponse::failure(response.status, response.message),
    }
}

/// Replaces the contact details of a guest session.
pub fn guest_session_update(
    ctx: &ApiContext,
    session_token: &str,
    details: &GuestDetails,
) -> ApiResponse<GuestSession> {
    with_service(ctx, "guest_session_update", STATUS_OK, |service| {
        let session = service.update_guest_details(session_token, details)?;
        Ok(("Guest details saved.".to_string(), session))
    })
}

/// Lists report templates. Needs no storage.
pub fn report_templates() -> ApiResponse<Vec<ReportTemplate>> {
    let templates = report_templates_inner().to_vec();
    ApiResponse::success(
        STATUS_OK,
        format!("Found {} template(s).", templates.len()),
        templates,
    )
}

/// Looks up one report template by id; unknown ids yield 404.
pub fn report_template(template_id: &str) -> ApiResponse<ReportTemplate> {
    match find_report_template(template_id.trim()) {
        Some(template) => ApiResponse::success(STATUS_OK, "Template found.", *template),
        None => ApiResponse::failure(
            STATUS_NOT_FOUND,
            format!("report_template failed: unknown template `{template_id}`"),
        ),
    }
}

fn with_connection<T>(
    ctx: &ApiContext,
    operation: &'static str,
    success_status: u16,
    f: impl FnOnce(&mut Connection) -> ServiceResult<(String, T)>,
) -> ApiResponse<T> {
    let mut conn = match open_db(&ctx.db_path) {
        Ok(conn) => conn,
        Err(err) => {
            error!("event=api_call module=api status=error operation={operation} kind=db_open");
            return ApiResponse::failure(
                STATUS_INTERNAL,
                format!("{operation} failed: DB open failed: {err}"),
            );
        }
    };

    match f(&mut conn) {
        Ok((message, data)) => ApiResponse::success(success_status, message, data),
        Err(err) => failure_from(operation, &err),
    }
}

fn with_service<T>(
    ctx: &ApiContext,
    operation: &'static str,
    success_status: u16,
    f: impl FnOnce(&Service<'_>) -> ServiceResult<(String, T)>,
) -> ApiResponse<T> {
    with_connection(ctx, operation, success_status, |conn| {
        let service = AssessmentService::new(
            SqliteCatalogRepository::try_new(conn)?,
            SqliteAssessmentRepository::try_new(conn)?,
            OwnershipPolicy,
        );
        f(&service)
    })
}

fn with_assessment<T>(
    ctx: &ApiContext,
    operation: &'static str,
    raw_assessment_id: &str,
    f: impl FnOnce(&Service<'_>, AssessmentId) -> ServiceResult<(String, T)>,
) -> ApiResponse<T> {
    let Ok(assessment_id) = Uuid::parse_str(raw_assessment_id.trim()) else {
        return ApiResponse::failure(
            STATUS_NOT_FOUND,
            format!("{operation} failed: assessment not found: {raw_assessment_id}"),
        );
    };
    with_service(ctx, operation, STATUS_OK, |service| f(service, assessment_id))
}

fn failure_from<T>(operation: &'static str, err: &AssessmentServiceError) -> ApiResponse<T> {
    let kind = err.kind();
    if kind == ErrorKind::Storage {
        error!("event=api_call module=api status=error operation={operation} kind=storage");
    }
    ApiResponse::failure(status_for(kind), format!("{operation} failed: {err}"))
}
