use httpmock::prelude::*;
use roster_migrate::app::commands::{self, MigrateRequest, PlanRequest, Selection};
use roster_migrate::domain::model::{OfferingId, PeriodId, ProfessorId};
use roster_migrate::{MigrateError, MigrationOutcome, MigrationPlanner, RestStore, TomlConfig};
use serde_json::{json, Value};

fn config_for(server: &MockServer) -> TomlConfig {
    TomlConfig::from_toml_str(&format!(
        r#"
[store]
url = "{}"
api_key = "anon-key"
timeout_seconds = 5
"#,
        server.base_url()
    ))
    .unwrap()
}

fn class(id: i64, level: i32, sublevel: i32, professor: i64, role: &str) -> Value {
    json!({
        "id": id,
        "subject_id": id * 10,
        "professor_id": professor,
        "active": true,
        "subjects": {"id": id * 10, "name": format!("English {}.{}", level, sublevel), "level": level, "sublevel": sublevel},
        "professors": {"id": professor, "name": format!("Prof {}", professor), "role": role}
    })
}

/// Source period 1: class 10 (1/1, 3 students) and 11 (1/2, no students).
/// Target period 2: class 20 (1/2), 21 (1/3) and 29 taught by an admin.
async fn mock_rosters(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/classes")
                .query_param("period_id", "eq.1")
                .query_param("active", "eq.true")
                .header("apikey", "anon-key")
                .header("authorization", "Bearer anon-key");
            then.status(200).json_body(json!([
                class(10, 1, 1, 100, "professor"),
                class(11, 1, 2, 101, "professor")
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/classes")
                .query_param("period_id", "eq.2");
            then.status(200).json_body(json!([
                class(20, 1, 2, 200, "professor"),
                class(21, 1, 3, 201, "professor"),
                class(29, 1, 2, 900, "admin")
            ]));
        })
        .await;

    for (class_id, total) in [(10, 3), (11, 0)] {
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::HEAD)
                    .path("/rest/v1/enrollments")
                    .query_param("class_id", format!("eq.{}", class_id))
                    .query_param("active", "eq.true")
                    .header("prefer", "count=exact");
                let range = if total == 0 {
                    "*/0".to_string()
                } else {
                    format!("0-{}/{}", total - 1, total)
                };
                then.status(200).header("content-range", range);
            })
            .await;
    }

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/enrollments")
                .query_param("select", "student_id")
                .query_param("class_id", "eq.10")
                .query_param("active", "eq.true");
            then.status(200).json_body(json!([
                {"student_id": 501},
                {"student_id": 502},
                {"student_id": 503}
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/enrollments")
                .query_param("select", "student_id")
                .query_param("class_id", "eq.11");
            then.status(200).json_body(json!([]));
        })
        .await;
}

fn request(pairs: Vec<(OfferingId, OfferingId)>) -> MigrateRequest {
    MigrateRequest {
        plan: PlanRequest {
            source: PeriodId(1),
            target: PeriodId(2),
            pairs,
            ..PlanRequest::default()
        },
        selection: Selection::All,
        dry_run: false,
    }
}

#[tokio::test]
async fn test_migrate_over_rest() {
    let server = MockServer::start_async().await;
    mock_rosters(&server).await;
    let insert = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/enrollments")
                .header("prefer", "return=minimal")
                .json_body(json!([
                    {"student_id": 501, "class_id": 21, "active": true},
                    {"student_id": 502, "class_id": 21, "active": true},
                    {"student_id": 503, "class_id": 21, "active": true}
                ]));
            then.status(201);
        })
        .await;

    let config = config_for(&server);
    let mut planner = MigrationPlanner::new(RestStore::new(&config).unwrap(), config.professor_role());

    let (preview, report) = commands::migrate(
        &mut planner,
        &request(vec![(OfferingId(10), OfferingId(21))]),
    )
    .await
    .unwrap();

    insert.assert_async().await;
    assert_eq!(report.outcome, MigrationOutcome::Migrated { count: 3 });
    // both classes resolve to 21, only 10 has students
    assert_eq!(report.offerings, 2);

    assert_eq!(preview.total_students, 3);
    assert_eq!(preview.rows.len(), 2);
    assert_eq!(preview.rows[0].target_class_id, Some(OfferingId(21)));
    assert_eq!(preview.rows[0].professor_id, Some(ProfessorId(201)));
    assert_eq!(preview.rows[0].professor_name.as_deref(), Some("Prof 201"));
    // 1/2 -> 1/3; the admin-taught class never appears as a target
    assert_eq!(preview.rows[1].target_class_id, Some(OfferingId(21)));
    assert!(planner.rosters().find_target(OfferingId(29)).is_none());
}

#[tokio::test]
async fn test_rejected_batch_surfaces_store_message() {
    let server = MockServer::start_async().await;
    mock_rosters(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/enrollments");
            then.status(409).json_body(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint \"enrollments_student_class_key\""
            }));
        })
        .await;

    let config = config_for(&server);
    let mut planner = MigrationPlanner::new(RestStore::new(&config).unwrap(), "professor");

    let err = commands::migrate(&mut planner, &request(Vec::new()))
        .await
        .unwrap_err();

    match &err {
        MigrateError::WriteFailure { message } => assert_eq!(
            message,
            "duplicate key value violates unique constraint \"enrollments_student_class_key\""
        ),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        err.user_friendly_message(),
        "Error: duplicate key value violates unique constraint \"enrollments_student_class_key\""
    );
}

#[tokio::test]
async fn test_dry_run_never_posts() {
    let server = MockServer::start_async().await;
    mock_rosters(&server).await;
    let insert = server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/enrollments");
            then.status(201);
        })
        .await;

    let config = config_for(&server);
    let mut planner = MigrationPlanner::new(RestStore::new(&config).unwrap(), "professor");
    let mut dry = request(Vec::new());
    dry.dry_run = true;

    let (_, report) = commands::migrate(&mut planner, &dry).await.unwrap();

    assert_eq!(report.outcome, MigrationOutcome::DryRun { count: 3 });
    assert_eq!(insert.hits_async().await, 0);
}

#[tokio::test]
async fn test_failed_roster_fetch_is_a_load_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/classes");
            then.status(401)
                .json_body(json!({"message": "JWT expired", "code": "PGRST301"}));
        })
        .await;

    let config = config_for(&server);
    let mut planner = MigrationPlanner::new(RestStore::new(&config).unwrap(), "professor");

    let err = planner
        .load_rosters(PeriodId(1), PeriodId(2))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MigrateError::LoadFailure { ref message, .. } if message == "JWT expired"
    ));
    assert!(planner.periods().is_none());
}

#[tokio::test]
async fn test_periods_are_listed_in_id_order() {
    let server = MockServer::start_async().await;
    let periods = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/periods")
                .query_param("order", "id.asc");
            then.status(200).json_body(json!([
                {"id": 1, "name": "2024-2", "active": false},
                {"id": 2, "name": "2025-1", "active": true}
            ]));
        })
        .await;

    let config = config_for(&server);
    let planner = MigrationPlanner::new(RestStore::new(&config).unwrap(), "professor");

    let listed = planner.list_periods().await.unwrap();

    periods.assert_async().await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1].name, "2025-1");
}
