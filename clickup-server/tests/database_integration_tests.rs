//! Database integration tests for PostgreSQL
//!
//! These tests require a running PostgreSQL instance named by
//! `TEST_DATABASE_URL`. They are skipped when it is unset or unreachable.

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use chrono::{Days, Utc};
use clickup_core::{AllocationCustomId, StatusCategory, TicketCustomId};
use clickup_server::api::{create_router, ApiState};
use clickup_server::auth::{GoogleProfile, StaticIdentityProvider, TokenType};
use clickup_server::config::{DatabaseConfig, ServerConfig};
use clickup_server::database::seed::{RoleSeed, TicketStatusSeed};
use clickup_server::database::{
    AllocationChanges, BoardFilter, DatabaseManager, PostgresManager, SeedData, TicketChanges,
};
use clickup_server::models::{NewUser, Project, TaskList};
use clickup_server::services::{group_by_status, AccountService, SprintPlanRequest};
use clickup_server::metrics::ApiMetrics;
use clickup_server::TrackerError;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::env;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinSet;
use tower::ServiceExt;

/// Connect and migrate, or `None` when no test database is available
async fn test_database() -> Option<Arc<PostgresManager>> {
    let url = env::var("TEST_DATABASE_URL").ok()?;
    let config = DatabaseConfig {
        postgres_url: url,
        max_connections: 5,
        min_connections: 0,
        acquire_timeout_secs: 2,
        ..DatabaseConfig::default()
    };
    let manager = match DatabaseManager::new(&config).await {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("Skipping database test: {}", e);
            return None;
        }
    };
    manager.migrate().await.ok()?;
    Some(manager.postgres)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &clickup_core::generate_id()[..8])
}

async fn create_project(db: &PostgresManager, short_code: &str) -> Result<Project> {
    let project = Project {
        id: clickup_core::generate_id(),
        name: unique("project"),
        erp_id: 7,
        short_code: short_code.to_string(),
        logo: String::new(),
    };
    db.insert_project(&project).await?;
    Ok(project)
}

async fn create_list(db: &PostgresManager, project: &Project) -> Result<TaskList> {
    let list = TaskList {
        id: clickup_core::generate_id(),
        name: unique("list"),
        project: project.id.clone(),
    };
    db.insert_list(&list).await?;
    Ok(list)
}

fn status_seed(title: &str, position: i32, category: StatusCategory) -> TicketStatusSeed {
    TicketStatusSeed {
        title: title.to_string(),
        icon: "circle".to_string(),
        color_info: "#00AAFF".to_string(),
        position,
        category: Some(category),
    }
}

#[tokio::test]
async fn test_seed_is_idempotent() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    let department = unique("dept");
    let seed = SeedData {
        departments: vec![department.clone()],
        roles: vec![RoleSeed {
            name: "Developer".to_string(),
            department,
        }],
        priorities: vec![unique("priority")],
        ticket_statuses: vec![status_seed(&unique("status"), 50, StatusCategory::Todo)],
        ..SeedData::default()
    };

    let first = db.seed(&seed).await?;
    let second = db.seed(&seed).await?;

    assert_eq!(first.inserted, 4);
    assert_eq!(second.inserted, 0);
    Ok(())
}

#[tokio::test]
async fn test_user_creation_rules() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    let accounts = AccountService::new(db.clone());
    let name = unique("user");
    let email = format!("{}@Example.COM", name);

    let user = accounts
        .create_user(NewUser::new(&name, &email, "s3cret-pass"))
        .await?;
    assert_eq!(user.email, format!("{}@example.com", name));
    assert!(!user.is_active);
    assert!(!user.is_staff);

    let found = db.get_user_by_email(&email.to_uppercase()).await?;
    assert_eq!(found.map(|u| u.id), Some(user.id.clone()));

    // Same username and email again
    let duplicate = accounts
        .create_user(NewUser::new(&name, &email, "s3cret-pass"))
        .await;
    assert!(matches!(duplicate, Err(TrackerError::Conflict(_))));

    let admin_name = unique("admin");
    let admin = accounts
        .create_superuser(NewUser::new(
            &admin_name,
            &format!("{}@example.com", admin_name),
            "s3cret-pass",
        ))
        .await?;
    assert!(admin.is_active && admin.is_staff && admin.is_superuser);
    Ok(())
}

#[tokio::test]
async fn test_sprint_batches_continue_numbering() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    let project = create_project(&db, "SPR").await?;
    let today = Utc::now().date_naive();
    let request = SprintPlanRequest {
        project: project.id.clone(),
        number_of_sprints: 2,
        sprint_duration: 5,
        start_date: today.checked_add_days(Days::new(1)).unwrap().to_string(),
    };

    let first = request.execute(&db, today).await?;
    let second = request.execute(&db, today).await?;

    assert_eq!(first.len(), 2);
    assert!(first[0].name.starts_with("Sprint 1 ("));
    assert!(first[1].name.starts_with("Sprint 2 ("));
    assert!(second[0].name.starts_with("Sprint 3 ("));
    assert!(first.iter().all(|s| !s.active));

    let missing = SprintPlanRequest {
        project: clickup_core::generate_id(),
        ..request.clone()
    };
    match missing.execute(&db, today).await {
        Err(TrackerError::BadRequest(message)) => assert_eq!(message, "Project doesn't Exist."),
        other => panic!("unexpected result: {:?}", other.map(|s| s.len())),
    }
    Ok(())
}

#[tokio::test]
async fn test_folder_with_new_lists_hides_them_from_project_lists() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    let project = create_project(&db, "FLD").await?;
    let loose = create_list(&db, &project).await?;
    let names = vec!["Backlog".to_string(), "Done".to_string()];

    let folder = db
        .create_folder_with_lists(&unique("folder"), &project.id, &names)
        .await?;
    assert_eq!(folder.list.len(), 2);

    let detail = db.project_details(vec![project.clone()]).await?.pop().unwrap();
    assert_eq!(detail.folders.len(), 1);
    assert_eq!(detail.lists, vec![loose.summary()]);

    let other = create_project(&db, "OTH").await?;
    let foreign = db
        .foreign_lists(&other.id, &[loose.id.clone()])
        .await?;
    assert_eq!(foreign, vec![loose.id.clone()]);
    Ok(())
}

#[tokio::test]
async fn test_ticket_and_allocation_sequences() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    let todo = unique("todo");
    let doing = unique("doing");
    db.seed(&SeedData {
        ticket_statuses: vec![
            status_seed(&todo, 1, StatusCategory::Todo),
            status_seed(&doing, 2, StatusCategory::InProgress),
        ],
        ..SeedData::default()
    })
    .await?;
    let statuses = db.all_ticket_statuses().await?;
    let todo_id = statuses.iter().find(|s| s.title == todo).unwrap().id.clone();
    let doing_id = statuses.iter().find(|s| s.title == doing).unwrap().id.clone();

    let project = create_project(&db, "TKT").await?;
    let list = create_list(&db, &project).await?;
    let changes = TicketChanges {
        kind: "task".to_string(),
        title: "Write docs".to_string(),
        list: Some(list.id.clone()),
        ..TicketChanges::default()
    };

    let first = db.insert_ticket(&changes, None).await?;
    let second = db.insert_ticket(&changes, None).await?;
    let first = db.get_ticket(&first).await?.unwrap();
    let second = db.get_ticket(&second).await?.unwrap();
    let first_id: TicketCustomId = first.custom_id.parse()?;
    let second_id: TicketCustomId = second.custom_id.parse()?;
    assert_eq!(first_id.short_code(), "TKT");
    assert_eq!(second_id.sequence(), first_id.sequence() + 1);

    // Neither list nor sprint
    let orphan = TicketChanges {
        list: None,
        ..changes.clone()
    };
    assert!(matches!(
        db.insert_ticket(&orphan, None).await,
        Err(TrackerError::Validation(_))
    ));

    let allocation = AllocationChanges {
        title: "Draft".to_string(),
        priority: None,
        ticket_status: Some(todo_id.clone()),
        estimation_seconds: 3_600,
        description: String::new(),
        start_date: None,
        due_date: None,
        assigned_users: Vec::new(),
        ticket: first.id.clone(),
    };
    let a1 = db.insert_allocation(&allocation, None).await?;
    let a2 = db
        .insert_allocation(
            &AllocationChanges {
                ticket_status: Some(doing_id.clone()),
                ..allocation.clone()
            },
            None,
        )
        .await?;
    let a1 = db.get_allocation(&a1).await?.unwrap();
    let a2 = db.get_allocation(&a2).await?.unwrap();
    assert_eq!(a1.custom_id, format!("{}#1", first.custom_id));
    let parsed: AllocationCustomId = a2.custom_id.parse()?;
    assert_eq!(parsed.sequence(), 2);

    db.update_allocation(&a1.id, &AllocationChanges::from(&a1), None)
        .await?;
    let updated = db.get_allocation(&a1.id).await?.unwrap();
    assert_eq!(updated.version, a1.version + 1);

    let tickets = db
        .board_tickets(&BoardFilter {
            list_id: Some(list.id.clone()),
            sprint_id: None,
        })
        .await?;
    let groups = group_by_status(&statuses, &tickets);
    let todo_group = groups.iter().find(|g| g.id == todo_id).unwrap();
    assert_eq!(todo_group.data.len(), 1);
    assert_eq!(todo_group.data[0].allocations.len(), 1);
    assert!(groups.iter().any(|g| g.id == doing_id));
    Ok(())
}

#[tokio::test]
async fn test_team_member_counters() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    let name = unique("member");
    let user = AccountService::new(db.clone())
        .create_user(NewUser::new(&name, &format!("{}@example.com", name), "pw-123456"))
        .await?;
    let employee = db.get_or_create_employee(&user.id).await?;
    let project = create_project(&db, "TMB").await?;

    let member_id = db
        .upsert_team_member(&employee.id, 6 * 3_600, &[project.id.clone()])
        .await?;
    let members = db.team_members(Some(&project.id)).await?;

    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, member_id);
    assert_eq!(members[0].allocation_hours, 6);
    assert_eq!(members[0].total_tickets, 0);
    assert!(db.unknown_team_members(&[member_id]).await?.is_empty());
    Ok(())
}

fn ticket_on(list: &TaskList) -> TicketChanges {
    TicketChanges {
        kind: "task".to_string(),
        title: unique("ticket"),
        list: Some(list.id.clone()),
        ..TicketChanges::default()
    }
}

fn allocation_on(ticket: &str) -> AllocationChanges {
    AllocationChanges {
        title: unique("allocation"),
        priority: None,
        ticket_status: None,
        estimation_seconds: 3_600,
        description: String::new(),
        start_date: None,
        due_date: None,
        assigned_users: Vec::new(),
        ticket: ticket.to_string(),
    }
}

#[tokio::test]
async fn test_allocation_ticket_is_fixed_after_creation() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    let project = create_project(&db, "MOV").await?;
    let list = create_list(&db, &project).await?;
    let first = db.insert_ticket(&ticket_on(&list), None).await?;
    let second = db.insert_ticket(&ticket_on(&list), None).await?;

    db.insert_allocation(&allocation_on(&first), None).await?;
    let moved = db.insert_allocation(&allocation_on(&first), None).await?;
    let existing = db.get_allocation(&moved).await?.unwrap();

    let change = AllocationChanges {
        ticket: second.clone(),
        ..AllocationChanges::from(&existing)
    };
    match db.update_allocation(&moved, &change, None).await {
        Err(TrackerError::Validation(fields)) => assert!(fields.contains_key("ticket")),
        other => panic!("unexpected result: {:?}", other),
    }
    let unchanged = db.get_allocation(&moved).await?.unwrap();
    assert_eq!(unchanged.custom_id, existing.custom_id);
    assert_eq!(unchanged.version, existing.version);

    // Numbering on the first ticket carries on
    let third = db.insert_allocation(&allocation_on(&first), None).await?;
    let third = db.get_allocation(&third).await?.unwrap();
    let parsed: AllocationCustomId = third.custom_id.parse()?;
    assert_eq!(parsed.sequence(), 3);
    Ok(())
}

#[tokio::test]
async fn test_ticket_update_keeps_a_list_or_sprint() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    let project = create_project(&db, "PLC").await?;
    let list = create_list(&db, &project).await?;
    let id = db.insert_ticket(&ticket_on(&list), None).await?;
    let ticket = db.get_ticket(&id).await?.unwrap();

    let detached = TicketChanges {
        list: None,
        sprint: None,
        ..TicketChanges::from(&ticket)
    };
    assert!(matches!(
        db.update_ticket(&id, &detached, None).await,
        Err(TrackerError::Validation(_))
    ));
    let stored = db.get_ticket(&id).await?.unwrap();
    assert_eq!(stored.list.as_deref(), Some(list.id.as_str()));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_sequences() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    const WRITERS: usize = 5;
    let project = create_project(&db, "CON").await?;
    let list = create_list(&db, &project).await?;

    let mut tasks = JoinSet::new();
    for _ in 0..WRITERS {
        let db = db.clone();
        let changes = ticket_on(&list);
        tasks.spawn(async move { db.insert_ticket(&changes, None).await });
    }
    let mut ticket_ids = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        ticket_ids.push(joined??);
    }
    let mut sequences = BTreeSet::new();
    for id in &ticket_ids {
        let ticket = db.get_ticket(id).await?.unwrap();
        let custom: TicketCustomId = ticket.custom_id.parse()?;
        sequences.insert(custom.sequence());
    }
    // Other tests share the global ticket sequence, so only uniqueness holds
    assert_eq!(sequences.len(), WRITERS);

    let ticket = ticket_ids[0].clone();
    let mut tasks = JoinSet::new();
    for _ in 0..WRITERS {
        let db = db.clone();
        let changes = allocation_on(&ticket);
        tasks.spawn(async move { db.insert_allocation(&changes, None).await });
    }
    let mut sequences = BTreeSet::new();
    while let Some(joined) = tasks.join_next().await {
        let allocation = db.get_allocation(&joined??).await?.unwrap();
        let custom: AllocationCustomId = allocation.custom_id.parse()?;
        sequences.insert(custom.sequence());
    }
    let expected: BTreeSet<u32> = (1..=WRITERS as u32).collect();
    assert_eq!(sequences, expected);
    Ok(())
}

struct SignInApp {
    app: axum::Router,
    tokens: clickup_server::auth::TokenService,
    media: TempDir,
}

fn sign_in_app(db: Arc<PostgresManager>, identity: StaticIdentityProvider) -> Result<SignInApp> {
    let media = TempDir::new()?;
    let mut config = ServerConfig::default();
    config.auth.jwt_secret = "integration-test-secret-value".to_string();
    config.media.root = media.path().to_path_buf();

    let state = ApiState::new(
        db,
        &config,
        Arc::new(identity),
        Arc::new(ApiMetrics::new()?),
    );
    let tokens = state.tokens.clone();
    Ok(SignInApp {
        app: create_router(state),
        tokens,
        media,
    })
}

async fn google_sign_in(app: &axum::Router, token: &str) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/sign-in/google")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "idToken": token }).to_string()))?;
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn test_google_sign_in_updates_profile_and_stores_photo() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    let name = unique("google");
    let email = format!("{}@example.com", name);
    let user = AccountService::new(db.clone())
        .create_user(NewUser::new(&name, &email, "pw-123456"))
        .await?;

    let profile = GoogleProfile {
        email: Some(email.clone()),
        given_name: Some("Ada".to_string()),
        family_name: Some("Lovelace".to_string()),
        picture: Some("https://example.com/ada.jpg".to_string()),
    };
    let identity = StaticIdentityProvider {
        profiles: HashMap::from([("ada-token".to_string(), profile)]),
        picture: b"jpeg-bytes".to_vec(),
    };
    let api = sign_in_app(db.clone(), identity)?;

    let (status, body) = google_sign_in(&api.app, "ada-token").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successfully");

    let data = &body["data"];
    let employee = db.get_employee_by_user(&user.id).await?.unwrap();
    assert_eq!(data["_id"], employee.id.as_str());
    assert_eq!(data["employeeName"], "Ada Lovelace");
    assert_eq!(data["employeeId"], employee.employee_id.as_str());
    assert_eq!(data["email"], email.as_str());
    assert_eq!(
        data["photo"],
        format!("/media/employee/{0}/{0}_photo.jpg", employee.id).as_str()
    );
    let access = data["accessToken"].as_str().unwrap();
    let refresh = data["refreshToken"].as_str().unwrap();
    assert_eq!(api.tokens.verify(access, TokenType::Access)?.sub, user.id);
    assert_eq!(api.tokens.verify(refresh, TokenType::Refresh)?.sub, user.id);

    let stored = db.get_user(&user.id).await?.unwrap();
    assert_eq!(stored.first_name, "Ada");
    assert_eq!(stored.last_name, "Lovelace");

    let photo = api
        .media
        .path()
        .join(format!("employee/{0}/{0}_photo.jpg", employee.id));
    assert_eq!(std::fs::read(photo)?, b"jpeg-bytes");

    // Signing in again reuses the employee
    let (status, body) = google_sign_in(&api.app, "ada-token").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["_id"], employee.id.as_str());
    Ok(())
}

#[tokio::test]
async fn test_google_sign_in_failures() -> Result<()> {
    let Some(db) = test_database().await else {
        return Ok(());
    };
    let name = unique("nopic");
    let email = format!("{}@example.com", name);
    AccountService::new(db.clone())
        .create_user(NewUser::new(&name, &email, "pw-123456"))
        .await?;

    let with_picture = GoogleProfile {
        email: Some(email),
        picture: Some("https://example.com/missing.jpg".to_string()),
        ..GoogleProfile::default()
    };
    let stranger = GoogleProfile {
        email: Some(format!("{}@example.com", unique("stranger"))),
        ..GoogleProfile::default()
    };
    // No picture bytes, so every download fails
    let identity = StaticIdentityProvider {
        profiles: HashMap::from([
            ("no-picture".to_string(), with_picture),
            ("stranger".to_string(), stranger),
        ]),
        picture: Vec::new(),
    };
    let api = sign_in_app(db, identity)?;

    let (status, body) = google_sign_in(&api.app, "no-picture").await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);

    let (status, body) = google_sign_in(&api.app, "stranger").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], "User Not found");
    Ok(())
}
