//! Core domain logic for organizational self-assessments.
//! This crate is the single source of truth for assessment invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::capability::{parse_permission, Action, Permission, ResourceKind};
pub use auth::policy::{AuthorizationPort, OwnershipPolicy, PermissionPolicy, ResourceRef};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::assessment::{
    Assessment, AssessmentId, AssessmentStatus, GuestDetails, GuestDetailsValidationError,
    GuestSession, OwnerRef,
};
pub use model::catalog::{
    CatalogImport, Category, CategoryId, Criterion, CriterionId, CriterionRef, Domain, DomainId,
    Tool, ToolId, ToolTree,
};
pub use model::response::{AssessmentResponse, ResponseValue};
pub use repo::assessment_repo::{AssessmentRepository, SqliteAssessmentRepository};
pub use repo::catalog_repo::{import_catalog, CatalogRepository, SqliteCatalogRepository};
pub use repo::{RepoError, RepoResult};
pub use service::assessment_service::{
    AssessmentService, AssessmentServiceError, ErrorKind, PendingResponse, SaveExitOutcome,
    ServiceResult,
};
pub use service::report_templates::{find_report_template, report_templates, ReportTemplate};
pub use service::scoring::{
    compute_report, round_percent, CategoryScore, CriterionResult, DomainScore, ScoreReport,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
