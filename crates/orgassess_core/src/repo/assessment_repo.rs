//! Assessment repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist assessments, their per-criterion responses and guest sessions.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - At most one response row per `(assessment, criterion)`; writes upsert.
//! - Response writes against a submitted assessment are rejected inside the
//!   same statement that performs the write, so a concurrent submit cannot
//!   slip between check and write.
//! - Status updates are conditional on the current status (`WHERE status IN`).

use super::{RepoError, RepoResult};
use crate::db::ensure_schema_ready;
use crate::model::assessment::{
    Assessment, AssessmentId, AssessmentStatus, GuestDetails, GuestSession, OwnerRef,
};
use crate::model::catalog::CriterionId;
use crate::model::response::{AssessmentResponse, ResponseValue};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const ASSESSMENT_SELECT_SQL: &str = "SELECT
    uuid,
    tool_id,
    user_id,
    guest_token,
    status,
    created_at,
    updated_at,
    submitted_at
FROM assessments";

const RESPONSE_SELECT_SQL: &str = "SELECT
    assessment_uuid,
    criterion_id,
    response,
    note,
    updated_at
FROM assessment_responses";

const ASSESSMENT_TABLES: &[(&str, &[&str])] = &[
    (
        "assessments",
        &[
            "uuid",
            "tool_id",
            "user_id",
            "guest_token",
            "status",
            "created_at",
            "updated_at",
            "submitted_at",
        ],
    ),
    (
        "assessment_responses",
        &["assessment_uuid", "criterion_id", "response", "note", "updated_at"],
    ),
    (
        "guest_sessions",
        &[
            "session_token",
            "name",
            "email",
            "organization",
            "assessment_uuid",
            "created_at",
            "updated_at",
        ],
    ),
];

/// Repository interface for assessment lifecycle and response storage.
pub trait AssessmentRepository {
    /// Inserts a new assessment row. Storage stamps the timestamps.
    fn create_assessment(&self, assessment: &Assessment) -> RepoResult<AssessmentId>;
    /// Loads one assessment by id.
    fn get_assessment(&self, id: AssessmentId) -> RepoResult<Option<Assessment>>;
    /// Lists one owner's assessments, newest first.
    fn list_assessments(&self, owner: &OwnerRef) -> RepoResult<Vec<Assessment>>;
    /// Moves status to `to` only if the current status is one of `from`.
    ///
    /// Returns whether a row changed. Entering `Submitted` stamps `submitted_at`.
    fn transition_status(
        &self,
        id: AssessmentId,
        from: &[AssessmentStatus],
        to: AssessmentStatus,
    ) -> RepoResult<bool>;
    /// Inserts or overwrites the response for `(assessment_id, criterion_id)`.
    fn upsert_response(
        &self,
        assessment_id: AssessmentId,
        criterion_id: CriterionId,
        response: ResponseValue,
        note: Option<&str>,
    ) -> RepoResult<()>;
    /// Loads one stored response.
    fn get_response(
        &self,
        assessment_id: AssessmentId,
        criterion_id: CriterionId,
    ) -> RepoResult<Option<AssessmentResponse>>;
    /// Lists all responses of one assessment ordered by criterion id.
    fn list_responses(&self, assessment_id: AssessmentId) -> RepoResult<Vec<AssessmentResponse>>;
    /// Creates the guest session if missing and points it at `assessment_id`.
    fn attach_guest_session(
        &self,
        session_token: &str,
        assessment_id: AssessmentId,
    ) -> RepoResult<()>;
    /// Creates the guest session if missing and replaces its contact details.
    fn save_guest_details(&self, session_token: &str, details: &GuestDetails) -> RepoResult<()>;
    /// Loads one guest session by token.
    fn get_guest_session(&self, session_token: &str) -> RepoResult<Option<GuestSession>>;
}

/// SQLite-backed assessment repository.
pub struct SqliteAssessmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssessmentRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, ASSESSMENT_TABLES)?;
        Ok(Self { conn })
    }
}

impl AssessmentRepository for SqliteAssessmentRepository<'_> {
    fn create_assessment(&self, assessment: &Assessment) -> RepoResult<AssessmentId> {
        let (user_id, guest_token) = owner_columns(&assessment.owner);
        self.conn.execute(
            "INSERT INTO assessments (
                uuid,
                tool_id,
                user_id,
                guest_token,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                assessment.id.to_string(),
                assessment.tool_id,
                user_id,
                guest_token,
                assessment.status.as_str(),
            ],
        )?;
        Ok(assessment.id)
    }

    fn get_assessment(&self, id: AssessmentId) -> RepoResult<Option<Assessment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ASSESSMENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_assessment_row(row)?));
        }
        Ok(None)
    }

    fn list_assessments(&self, owner: &OwnerRef) -> RepoResult<Vec<Assessment>> {
        let column = match owner {
            OwnerRef::User(_) => "user_id",
            OwnerRef::Guest(_) => "guest_token",
        };
        let mut stmt = self.conn.prepare(&format!(
            "{ASSESSMENT_SELECT_SQL}
             WHERE {column} = ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([owner.key()])?;
        let mut assessments = Vec::new();
        while let Some(row) = rows.next()? {
            assessments.push(parse_assessment_row(row)?);
        }
        Ok(assessments)
    }

    fn transition_status(
        &self,
        id: AssessmentId,
        from: &[AssessmentStatus],
        to: AssessmentStatus,
    ) -> RepoResult<bool> {
        if from.is_empty() {
            return Ok(false);
        }

        let placeholders = vec!["?"; from.len()].join(", ");
        let sql = format!(
            "UPDATE assessments
             SET
                status = ?,
                updated_at = (strftime('%s', 'now') * 1000),
                submitted_at = CASE
                    WHEN ? = 'submitted' THEN (strftime('%s', 'now') * 1000)
                    ELSE submitted_at
                END
             WHERE uuid = ?
               AND status IN ({placeholders});"
        );

        let mut bind_values: Vec<Value> = vec![
            Value::Text(to.as_str().to_string()),
            Value::Text(to.as_str().to_string()),
            Value::Text(id.to_string()),
        ];
        bind_values.extend(
            from.iter()
                .map(|status| Value::Text(status.as_str().to_string())),
        );

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed > 0)
    }

    fn upsert_response(
        &self,
        assessment_id: AssessmentId,
        criterion_id: CriterionId,
        response: ResponseValue,
        note: Option<&str>,
    ) -> RepoResult<()> {
        let assessment_uuid = assessment_id.to_string();
        // The WHERE clause also disambiguates `ON CONFLICT` from a join `ON`.
        let changed = self.conn.execute(
            "INSERT INTO assessment_responses (
                assessment_uuid,
                criterion_id,
                response,
                note
            )
            SELECT ?1, ?2, ?3, ?4
            WHERE EXISTS (
                SELECT 1 FROM assessments
                WHERE uuid = ?1 AND status <> 'submitted'
            )
            ON CONFLICT (assessment_uuid, criterion_id) DO UPDATE SET
                response = excluded.response,
                note = excluded.note,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![assessment_uuid, criterion_id, response.as_str(), note],
        )?;

        if changed > 0 {
            return Ok(());
        }

        match self.get_assessment(assessment_id)? {
            None => Err(RepoError::AssessmentNotFound(assessment_id)),
            Some(_) => Err(RepoError::AssessmentClosed(assessment_id)),
        }
    }

    fn get_response(
        &self,
        assessment_id: AssessmentId,
        criterion_id: CriterionId,
    ) -> RepoResult<Option<AssessmentResponse>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RESPONSE_SELECT_SQL}
             WHERE assessment_uuid = ?1 AND criterion_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![assessment_id.to_string(), criterion_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_response_row(row)?));
        }
        Ok(None)
    }

    fn list_responses(&self, assessment_id: AssessmentId) -> RepoResult<Vec<AssessmentResponse>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RESPONSE_SELECT_SQL}
             WHERE assessment_uuid = ?1
             ORDER BY criterion_id ASC;"
        ))?;
        let mut rows = stmt.query([assessment_id.to_string()])?;
        let mut responses = Vec::new();
        while let Some(row) = rows.next()? {
            responses.push(parse_response_row(row)?);
        }
        Ok(responses)
    }

    fn attach_guest_session(
        &self,
        session_token: &str,
        assessment_id: AssessmentId,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO guest_sessions (session_token, assessment_uuid)
             VALUES (?1, ?2)
             ON CONFLICT (session_token) DO UPDATE SET
                assessment_uuid = excluded.assessment_uuid,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![session_token, assessment_id.to_string()],
        )?;
        Ok(())
    }

    fn save_guest_details(&self, session_token: &str, details: &GuestDetails) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO guest_sessions (session_token, name, email, organization)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (session_token) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                organization = excluded.organization,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                session_token,
                details.name.as_deref(),
                details.email.as_deref(),
                details.organization.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn get_guest_session(&self, session_token: &str) -> RepoResult<Option<GuestSession>> {
        let raw = self
            .conn
            .query_row(
                "SELECT
                    session_token,
                    name,
                    email,
                    organization,
                    assessment_uuid,
                    created_at,
                    updated_at
                 FROM guest_sessions
                 WHERE session_token = ?1;",
                [session_token],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        GuestDetails {
                            name: row.get(1)?,
                            email: row.get(2)?,
                            organization: row.get(3)?,
                        },
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((session_token, details, assessment_text, created_at, updated_at)) = raw else {
            return Ok(None);
        };
        let assessment_id = assessment_text
            .map(|text| parse_uuid(&text, "guest_sessions.assessment_uuid"))
            .transpose()?;

        Ok(Some(GuestSession {
            session_token,
            details,
            assessment_id,
            created_at,
            updated_at,
        }))
    }
}

fn owner_columns(owner: &OwnerRef) -> (Option<&str>, Option<&str>) {
    match owner {
        OwnerRef::User(id) => (Some(id.as_str()), None),
        OwnerRef::Guest(token) => (None, Some(token.as_str())),
    }
}

fn parse_assessment_row(row: &Row<'_>) -> RepoResult<Assessment> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "assessments.uuid")?;

    let status_text: String = row.get("status")?;
    let status = AssessmentStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in assessments.status"
        ))
    })?;

    let user_id: Option<String> = row.get("user_id")?;
    let guest_token: Option<String> = row.get("guest_token")?;
    let owner = match (user_id, guest_token) {
        (Some(user_id), None) => OwnerRef::User(user_id),
        (None, Some(token)) => OwnerRef::Guest(token),
        _ => {
            return Err(RepoError::InvalidData(format!(
                "assessment {id} must have exactly one owner column set"
            )));
        }
    };

    Ok(Assessment {
        id,
        tool_id: row.get("tool_id")?,
        owner,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        submitted_at: row.get("submitted_at")?,
    })
}

fn parse_response_row(row: &Row<'_>) -> RepoResult<AssessmentResponse> {
    let uuid_text: String = row.get("assessment_uuid")?;
    let assessment_id = parse_uuid(&uuid_text, "assessment_responses.assessment_uuid")?;

    let response_text: String = row.get("response")?;
    let response = ResponseValue::parse(&response_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid response `{response_text}` in assessment_responses.response"
        ))
    })?;

    Ok(AssessmentResponse {
        assessment_id,
        criterion_id: row.get("criterion_id")?,
        response,
        note: row.get("note")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
