//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`AssessmentNotFound`,
//!   `AssessmentClosed`) in addition to DB transport errors.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::assessment::AssessmentId;
use crate::model::catalog::ToolId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod assessment_repo;
pub mod catalog_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by catalog and assessment persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    ToolNotFound(ToolId),
    AssessmentNotFound(AssessmentId),
    /// Write rejected because the assessment is already submitted.
    AssessmentClosed(AssessmentId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ToolNotFound(id) => write!(f, "tool not found: {id}"),
            Self::AssessmentNotFound(id) => write!(f, "assessment not found: {id}"),
            Self::AssessmentClosed(id) => write!(f, "assessment is submitted: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
