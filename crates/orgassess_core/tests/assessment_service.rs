use orgassess_core::db::open_db_in_memory;
use orgassess_core::{
    import_catalog, round_percent, AssessmentService, AssessmentServiceError, AssessmentStatus,
    CatalogImport, CatalogRepository, ErrorKind, GuestDetails, OwnershipPolicy, OwnerRef,
    PendingResponse, PermissionPolicy, ResponseValue, SqliteAssessmentRepository,
    SqliteCatalogRepository, ToolTree,
};
use rusqlite::Connection;
use uuid::Uuid;

type Service<'conn, P> =
    AssessmentService<SqliteCatalogRepository<'conn>, SqliteAssessmentRepository<'conn>, P>;

const CATALOG_JSON: &str = r#"{
    "tools": [
        {
            "name": "Security",
            "domains": [
                {
                    "name": "Access Control",
                    "categories": [
                        { "name": "Passwords", "criteria": ["A", "B"] },
                        { "name": "Sessions", "criteria": ["C", "D", "E", "F"] }
                    ]
                },
                {
                    "name": "Operations",
                    "categories": [
                        { "name": "Backups", "criteria": ["G", "H"] }
                    ]
                }
            ]
        },
        {
            "name": "Governance",
            "domains": [
                { "name": "Policy", "categories": [ { "name": "Charter", "criteria": ["Z"] } ] }
            ]
        }
    ]
}"#;

fn seeded_conn() -> (Connection, Vec<i64>) {
    let mut conn = open_db_in_memory().unwrap();
    let import: CatalogImport = serde_json::from_str(CATALOG_JSON).unwrap();
    let tool_ids = import_catalog(&mut conn, &import).unwrap();
    (conn, tool_ids)
}

fn service(conn: &Connection) -> Service<'_, OwnershipPolicy> {
    AssessmentService::new(
        SqliteCatalogRepository::try_new(conn).unwrap(),
        SqliteAssessmentRepository::try_new(conn).unwrap(),
        OwnershipPolicy,
    )
}

fn tree(conn: &Connection, tool_id: i64) -> ToolTree {
    SqliteCatalogRepository::try_new(conn)
        .unwrap()
        .load_tool_tree(tool_id)
        .unwrap()
        .unwrap()
}

fn response_rows(conn: &Connection, assessment_id: Uuid) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM assessment_responses WHERE assessment_uuid = ?1;",
        [assessment_id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn start_assessment_requires_existing_tool() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");

    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();
    assert_eq!(assessment.status, AssessmentStatus::InProgress);
    assert_eq!(assessment.owner, owner);

    let err = service.start_assessment(9_999, &owner).unwrap_err();
    assert!(matches!(err, AssessmentServiceError::ToolNotFound(9_999)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn recording_twice_keeps_one_row_with_latest_value() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");
    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();
    let criterion = tree(&conn, tool_ids[0]).domains[0].categories[0].criteria[0].id;

    service
        .record_response(&owner, assessment.id, criterion, 100, Some("policy exists"))
        .unwrap();
    service
        .record_response(&owner, assessment.id, criterion, 0, Some("  expired  "))
        .unwrap();

    assert_eq!(response_rows(&conn, assessment.id), 1);
    let responses = service.list_responses(&owner, assessment.id).unwrap();
    assert_eq!(responses[0].response, ResponseValue::No);
    assert_eq!(responses[0].note.as_deref(), Some("expired"));
}

#[test]
fn unknown_raw_value_is_stored_as_na() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");
    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();
    let criterion = tree(&conn, tool_ids[0]).domains[0].categories[0].criteria[0].id;

    let stored = service
        .record_response(&owner, assessment.id, criterion, 75, None)
        .unwrap();
    assert_eq!(stored, ResponseValue::Na);
}

#[test]
fn record_response_rejects_unknown_or_foreign_criteria() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");
    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();
    let foreign = tree(&conn, tool_ids[1]).domains[0].categories[0].criteria[0].id;

    let err = service
        .record_response(&owner, assessment.id, 9_999, 100, None)
        .unwrap_err();
    assert!(matches!(err, AssessmentServiceError::CriterionNotFound(9_999)));

    let err = service
        .record_response(&owner, assessment.id, foreign, 100, None)
        .unwrap_err();
    assert!(matches!(err, AssessmentServiceError::CriterionNotFound(id) if id == foreign));

    let err = service
        .record_response(&owner, Uuid::new_v4(), foreign, 100, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn non_owner_is_forbidden_and_nothing_is_written() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");
    let intruder = OwnerRef::guest("u-1");
    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();
    let criterion = tree(&conn, tool_ids[0]).domains[0].categories[0].criteria[0].id;

    let err = service
        .record_response(&intruder, assessment.id, criterion, 100, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(response_rows(&conn, assessment.id), 0);

    for err in [
        service.save_and_exit(&intruder, assessment.id).unwrap_err(),
        service.submit(&intruder, assessment.id).unwrap_err(),
        service.compute_score(&intruder, assessment.id).unwrap_err(),
    ] {
        assert!(matches!(err, AssessmentServiceError::Forbidden { .. }));
    }
}

#[test]
fn submit_closes_assessment_for_further_responses() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");
    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();
    let criterion = tree(&conn, tool_ids[0]).domains[0].categories[0].criteria[0].id;
    service
        .record_response(&owner, assessment.id, criterion, 100, None)
        .unwrap();

    let submitted = service.submit(&owner, assessment.id).unwrap();
    assert_eq!(submitted.status, AssessmentStatus::Submitted);
    assert!(submitted.submitted_at.is_some());

    let err = service
        .record_response(&owner, assessment.id, criterion, 0, None)
        .unwrap_err();
    assert!(matches!(err, AssessmentServiceError::AssessmentClosed(id) if id == assessment.id));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let responses = service.list_responses(&owner, assessment.id).unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].response, ResponseValue::Yes);

    let err = service.submit(&owner, assessment.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn save_and_exit_moves_in_progress_to_draft_and_is_idempotent() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");
    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();

    assert_eq!(
        service.save_and_exit(&owner, assessment.id).unwrap(),
        AssessmentStatus::Draft
    );
    assert_eq!(
        service.save_and_exit(&owner, assessment.id).unwrap(),
        AssessmentStatus::Draft
    );
    let loaded = service.get_assessment(&owner, assessment.id).unwrap();
    assert_eq!(loaded.status, AssessmentStatus::Draft);

    service.submit(&owner, assessment.id).unwrap();
    assert_eq!(
        service.save_and_exit(&owner, assessment.id).unwrap(),
        AssessmentStatus::Submitted
    );
}

#[test]
fn draft_assessments_still_accept_responses_and_submit() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");
    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();
    let criterion = tree(&conn, tool_ids[0]).domains[0].categories[0].criteria[0].id;
    service.save_and_exit(&owner, assessment.id).unwrap();

    service
        .record_response(&owner, assessment.id, criterion, 100, None)
        .unwrap();
    let loaded = service.get_assessment(&owner, assessment.id).unwrap();
    assert_eq!(loaded.status, AssessmentStatus::Draft);

    let submitted = service.submit(&owner, assessment.id).unwrap();
    assert_eq!(submitted.status, AssessmentStatus::Submitted);
}

#[test]
fn batched_save_and_exit_keeps_items_before_a_failure() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");
    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();
    let tree = tree(&conn, tool_ids[0]);
    let passwords = &tree.domains[0].categories[0];

    let entries = vec![
        PendingResponse {
            criterion_id: passwords.criteria[0].id,
            raw_value: Some(100),
            note: None,
        },
        PendingResponse {
            criterion_id: passwords.criteria[1].id,
            raw_value: None,
            note: None,
        },
        PendingResponse {
            criterion_id: 9_999,
            raw_value: Some(0),
            note: None,
        },
    ];

    let err = service
        .save_and_exit_with_responses(&owner, assessment.id, &entries)
        .unwrap_err();
    assert!(matches!(err, AssessmentServiceError::CriterionNotFound(9_999)));
    assert_eq!(response_rows(&conn, assessment.id), 1);

    let loaded = service.get_assessment(&owner, assessment.id).unwrap();
    assert_eq!(loaded.status, AssessmentStatus::InProgress);

    let outcome = service
        .save_and_exit_with_responses(&owner, assessment.id, &entries[..2])
        .unwrap();
    assert_eq!(outcome.recorded, 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.status, AssessmentStatus::Draft);
}

#[test]
fn single_category_scenario_scores_fifty_percent_everywhere() {
    let mut conn = open_db_in_memory().unwrap();
    let import: CatalogImport = serde_json::from_str(
        r#"{"tools":[{"name":"Security","domains":[{"name":"Access Control",
            "categories":[{"name":"Passwords","criteria":["A","B"]}]}]}]}"#,
    )
    .unwrap();
    let tool_id = import_catalog(&mut conn, &import).unwrap()[0];
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");
    let assessment = service.start_assessment(tool_id, &owner).unwrap();
    let criteria = &tree(&conn, tool_id).domains[0].categories[0].criteria;

    service
        .record_response(&owner, assessment.id, criteria[0].id, 100, None)
        .unwrap();
    service
        .record_response(&owner, assessment.id, criteria[1].id, 0, None)
        .unwrap();

    let report = service.compute_score(&owner, assessment.id).unwrap();
    assert_eq!(report.categories[0].score, Some(50.0));
    assert_eq!(report.domains[0].score, Some(50.0));
    assert_eq!(report.tool_score, Some(50.0));
    assert_eq!(report.tool_name, "Security");
}

#[test]
fn compute_score_excludes_na_and_all_na_categories() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let owner = OwnerRef::user("u-1");
    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();
    let tree = tree(&conn, tool_ids[0]);
    let passwords = &tree.domains[0].categories[0].criteria;
    let sessions = &tree.domains[0].categories[1].criteria;
    let backups = &tree.domains[1].categories[0].criteria;

    // Passwords: all na.
    for criterion in passwords {
        service
            .record_response(&owner, assessment.id, criterion.id, 50, None)
            .unwrap();
    }
    // Sessions: yes, yes, no, na.
    for (criterion, raw) in sessions.iter().zip([100, 100, 0, 50]) {
        service
            .record_response(&owner, assessment.id, criterion.id, raw, None)
            .unwrap();
    }
    // Backups: yes, yes.
    for criterion in backups {
        service
            .record_response(&owner, assessment.id, criterion.id, 100, None)
            .unwrap();
    }

    let report = service.compute_score(&owner, assessment.id).unwrap();
    assert_eq!(report.categories[0].score, None);
    let sessions_score = report.categories[1].score.unwrap();
    assert_eq!(round_percent(sessions_score), 66.67);

    let access_control = report.domains[0].score.unwrap();
    assert_eq!(round_percent(access_control), 66.67);
    assert_eq!(report.domains[1].score, Some(100.0));

    let tool = report.tool_score.unwrap();
    assert_eq!(round_percent(tool), 83.33);
    assert_eq!(report.answered, 8);
    assert_eq!(report.total_criteria, 8);
}

#[test]
fn guest_flow_resumes_latest_assessment_and_updates_details() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);
    let guest = OwnerRef::guest("browser-session-42");

    assert!(service
        .resume_guest_assessment("browser-session-42")
        .unwrap()
        .is_none());

    let first = service.start_assessment(tool_ids[0], &guest).unwrap();
    let resumed = service
        .resume_guest_assessment("browser-session-42")
        .unwrap()
        .unwrap();
    assert_eq!(resumed.id, first.id);

    let second = service.start_assessment(tool_ids[1], &guest).unwrap();
    let resumed = service
        .resume_guest_assessment("browser-session-42")
        .unwrap()
        .unwrap();
    assert_eq!(resumed.id, second.id);

    let session = service
        .update_guest_details(
            "browser-session-42",
            &GuestDetails {
                name: Some(" Dana ".to_string()),
                email: Some("dana@example.org".to_string()),
                organization: Some("Acme".to_string()),
            },
        )
        .unwrap();
    assert_eq!(session.details.name.as_deref(), Some("Dana"));
    assert_eq!(session.assessment_id, Some(second.id));

    let err = service
        .update_guest_details(
            "browser-session-42",
            &GuestDetails {
                email: Some("nope".to_string()),
                ..GuestDetails::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let listed = service.list_assessments(&guest).unwrap();
    assert_eq!(listed.len(), 2);
}

#[test]
fn blank_guest_token_cannot_start_assessment() {
    let (conn, tool_ids) = seeded_conn();
    let service = service(&conn);

    let err = service
        .start_assessment(tool_ids[0], &OwnerRef::guest("   "))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn permission_policy_lets_reviewer_read_but_not_write() {
    let (conn, tool_ids) = seeded_conn();
    let mut policy = PermissionPolicy::new();
    policy.grant("reviewer", ["view_assessment"]).unwrap();
    let service = AssessmentService::new(
        SqliteCatalogRepository::try_new(&conn).unwrap(),
        SqliteAssessmentRepository::try_new(&conn).unwrap(),
        policy,
    );
    let owner = OwnerRef::user("u-1");
    let reviewer = OwnerRef::user("reviewer");
    let assessment = service.start_assessment(tool_ids[0], &owner).unwrap();

    let report = service.compute_score(&reviewer, assessment.id).unwrap();
    assert_eq!(report.tool_score, None);

    let err = service.submit(&reviewer, assessment.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}
