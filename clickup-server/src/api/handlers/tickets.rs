//! Priority, status, ticket and allocation handlers
//!
//! Ticket endpoints accept anonymous callers; a valid access token only
//! decides who is recorded in the audit fields.

use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use clickup_core::DEFAULT_ALLOCATION_SECONDS;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{acting_employee, missing_reference};
use crate::api::extract::{is_truthy, nullable, required, AuthUser, JsonBody};
use crate::api::present::WithMediaUrls;
use crate::api::responses::{invalid_page, ApiResponse, PageQuery};
use crate::api::ApiState;
use crate::database::{AllocationChanges, BoardFilter, TicketChanges};
use crate::error::{TrackerError, TrackerResult};
use crate::services::{group_by_status, BoardPage};

// Reference data

pub async fn list_priorities(State(state): State<ApiState>) -> TrackerResult<ApiResponse> {
    let priorities = state.db.list_priorities().await?;
    ApiResponse::ok(&json!({ "priority": priorities }))
}

pub async fn list_ticket_statuses(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> TrackerResult<ApiResponse> {
    let total = state.db.count_ticket_statuses().await?;
    let window = query.window(&state.config, total)?;
    let statuses = state
        .db
        .list_ticket_statuses(window.limit as i64, window.offset())
        .await?;
    ApiResponse::ok(&json!({ "status": statuses, "pagination": window.info(total) }))
}

// Tickets

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub priority: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub list: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub sprint: Option<Option<String>>,
}

impl TicketPayload {
    fn apply(self, changes: &mut TicketChanges) {
        if let Some(kind) = self.kind {
            changes.kind = kind;
        }
        if let Some(title) = self.title {
            changes.title = title;
        }
        if let Some(description) = self.description {
            changes.description = description;
        }
        if let Some(date) = self.start_date {
            changes.start_date = date;
        }
        if let Some(date) = self.due_date {
            changes.due_date = date;
        }
        if let Some(priority) = self.priority {
            changes.priority = priority;
        }
        if let Some(list) = self.list {
            changes.list = list;
        }
        if let Some(sprint) = self.sprint {
            changes.sprint = sprint;
        }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(body: Value) -> TrackerResult<T> {
    serde_json::from_value(body)
        .map_err(|e| TrackerError::BadRequest(format!("Failed to deserialize the JSON body: {}", e)))
}

/// Board parameter given either as a number or a numeric string
fn numeric_param(params: &Value, key: &str) -> Option<u32> {
    match params.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_param(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub async fn list_tickets(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> TrackerResult<ApiResponse> {
    let total = state.db.count_tickets().await?;
    let window = query.window(&state.config, total)?;
    let tickets = state.db.list_tickets(window.limit as i64, window.offset()).await?;
    ApiResponse::paginated(&tickets.with_media_urls(&state.media), window.info(total))
}

/// Board query when `params` is set, ticket creation otherwise
pub async fn create_or_board(
    State(state): State<ApiState>,
    user: Option<AuthUser>,
    JsonBody(body): JsonBody<Value>,
) -> TrackerResult<ApiResponse> {
    match body.get("params") {
        Some(params) if is_truthy(params) => board(&state, params).await,
        _ => create_ticket(&state, user, body).await,
    }
}

async fn board(state: &ApiState, params: &Value) -> TrackerResult<ApiResponse> {
    let filter = BoardFilter {
        list_id: text_param(params, "listId"),
        sprint_id: text_param(params, "sprintId"),
    };
    let page = numeric_param(params, "page").unwrap_or(1);
    let limit = numeric_param(params, "limit")
        .filter(|l| *l > 0)
        .map(|l| l.min(state.config.max_page_size))
        .unwrap_or(state.config.default_page_size);
    debug!("Board query {:?} page {} limit {}", filter, page, limit);

    let statuses = state.db.all_ticket_statuses().await?;
    let tickets = state.db.board_tickets(&filter).await?;
    let mut board = BoardPage::paginate(group_by_status(&statuses, &tickets), page, limit)
        .ok_or_else(invalid_page)?;
    board.ticket_data = board.ticket_data.with_media_urls(&state.media);
    ApiResponse::ok(&board)
}

async fn create_ticket(
    state: &ApiState,
    user: Option<AuthUser>,
    body: Value,
) -> TrackerResult<ApiResponse> {
    let payload: TicketPayload = parse_payload(body)?;
    let mut changes = TicketChanges {
        kind: required(payload.kind.clone(), "type")?,
        title: required(payload.title.clone(), "title")?,
        ..TicketChanges::default()
    };
    payload.apply(&mut changes);

    let actor = acting_employee(state, user).await?;
    let id = state.db.insert_ticket(&changes, actor.as_deref()).await?;
    let ticket = state
        .db
        .get_ticket(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Ticket"))?;
    info!("Created ticket {}", ticket.custom_id);
    ApiResponse::created(&ticket.with_media_urls(&state.media))
}

pub async fn get_ticket(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    let ticket = state
        .db
        .get_ticket(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Ticket"))?;
    ApiResponse::ok(&ticket.with_media_urls(&state.media))
}

pub async fn update_ticket(
    State(state): State<ApiState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<TicketPayload>,
) -> TrackerResult<ApiResponse> {
    let existing = state
        .db
        .get_ticket(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Ticket"))?;
    let mut changes = TicketChanges::from(&existing);
    payload.apply(&mut changes);

    let actor = acting_employee(&state, user).await?;
    state.db.update_ticket(&id, &changes, actor.as_deref()).await?;
    let ticket = state
        .db
        .get_ticket(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Ticket"))?;
    ApiResponse::ok(&ticket.with_media_urls(&state.media))
}

pub async fn delete_ticket(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    if !state.db.delete_ticket(&id).await? {
        return Err(TrackerError::not_found("Ticket"));
    }
    Ok(ApiResponse::empty())
}

// Allocations

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPayload {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub priority: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub ticket_status: Option<Option<String>>,
    #[serde(default, with = "clickup_core::duration::hms::option")]
    pub estimation_hours: Option<i64>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<NaiveDate>>,
    pub assigned_users: Option<Vec<String>>,
    pub ticket: Option<String>,
}

impl AllocationPayload {
    fn apply(self, changes: &mut AllocationChanges) {
        if let Some(title) = self.title {
            changes.title = title;
        }
        if let Some(priority) = self.priority {
            changes.priority = priority;
        }
        if let Some(status) = self.ticket_status {
            changes.ticket_status = status;
        }
        if let Some(seconds) = self.estimation_hours {
            changes.estimation_seconds = seconds;
        }
        if let Some(description) = self.description {
            changes.description = description;
        }
        if let Some(date) = self.start_date {
            changes.start_date = date;
        }
        if let Some(date) = self.due_date {
            changes.due_date = date;
        }
        if let Some(users) = self.assigned_users {
            changes.assigned_users = users;
        }
        if let Some(ticket) = self.ticket {
            changes.ticket = ticket;
        }
    }
}

async fn ensure_team_members(state: &ApiState, ids: &[String]) -> TrackerResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    match state.db.unknown_team_members(ids).await?.first() {
        Some(id) => Err(missing_reference("assignedUsers", id)),
        None => Ok(()),
    }
}

pub async fn list_allocations(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> TrackerResult<ApiResponse> {
    let total = state.db.count_allocations().await?;
    let window = query.window(&state.config, total)?;
    let allocations = state
        .db
        .list_allocations(window.limit as i64, window.offset())
        .await?;
    ApiResponse::paginated(&allocations.with_media_urls(&state.media), window.info(total))
}

pub async fn get_allocation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    let allocation = state
        .db
        .get_allocation(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Ticket allocation"))?;
    ApiResponse::ok(&allocation.with_media_urls(&state.media))
}

pub async fn create_allocation(
    State(state): State<ApiState>,
    user: Option<AuthUser>,
    JsonBody(payload): JsonBody<AllocationPayload>,
) -> TrackerResult<ApiResponse> {
    let mut changes = AllocationChanges {
        title: required(payload.title.clone(), "title")?,
        priority: None,
        ticket_status: None,
        estimation_seconds: DEFAULT_ALLOCATION_SECONDS,
        description: String::new(),
        start_date: None,
        due_date: None,
        assigned_users: Vec::new(),
        ticket: required(payload.ticket.clone(), "ticket")?,
    };
    payload.apply(&mut changes);
    ensure_team_members(&state, &changes.assigned_users).await?;

    let actor = acting_employee(&state, user).await?;
    let id = state.db.insert_allocation(&changes, actor.as_deref()).await?;
    let allocation = state
        .db
        .get_allocation(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Ticket allocation"))?;
    info!("Created allocation {}", allocation.custom_id);
    ApiResponse::created(&allocation.with_media_urls(&state.media))
}

pub async fn update_allocation(
    State(state): State<ApiState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<AllocationPayload>,
) -> TrackerResult<ApiResponse> {
    let existing = state
        .db
        .get_allocation(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Ticket allocation"))?;
    let mut changes = AllocationChanges::from(&existing);
    payload.apply(&mut changes);
    ensure_team_members(&state, &changes.assigned_users).await?;

    let actor = acting_employee(&state, user).await?;
    state.db.update_allocation(&id, &changes, actor.as_deref()).await?;
    let allocation = state
        .db
        .get_allocation(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Ticket allocation"))?;
    ApiResponse::ok(&allocation.with_media_urls(&state.media))
}

pub async fn delete_allocation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    if !state.db.delete_allocation(&id).await? {
        return Err(TrackerError::not_found("Ticket allocation"));
    }
    Ok(ApiResponse::empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_params_accept_numbers_and_strings() {
        let params = json!({"page": 2, "limit": "5", "listId": "abc", "sprintId": ""});
        assert_eq!(numeric_param(&params, "page"), Some(2));
        assert_eq!(numeric_param(&params, "limit"), Some(5));
        assert_eq!(text_param(&params, "listId").as_deref(), Some("abc"));
        assert_eq!(text_param(&params, "sprintId"), None);
        assert_eq!(numeric_param(&params, "missing"), None);
    }

    #[test]
    fn ticket_payload_overlays_only_given_fields() {
        let payload: TicketPayload = serde_json::from_value(json!({
            "title": "Renamed",
            "dueDate": null,
            "sprint": "s1",
        }))
        .unwrap();
        let mut changes = TicketChanges {
            kind: "bug".to_string(),
            title: "Original".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            list: Some("l1".to_string()),
            ..TicketChanges::default()
        };
        payload.apply(&mut changes);

        assert_eq!(changes.kind, "bug");
        assert_eq!(changes.title, "Renamed");
        assert_eq!(changes.due_date, None);
        assert_eq!(changes.list.as_deref(), Some("l1"));
        assert_eq!(changes.sprint.as_deref(), Some("s1"));
    }

    #[test]
    fn allocation_estimate_is_a_duration_string() {
        let payload: AllocationPayload = serde_json::from_value(json!({
            "title": "Implement",
            "ticket": "t1",
            "estimationHours": "02:30:00",
        }))
        .unwrap();
        assert_eq!(payload.estimation_hours, Some(9_000));

        let err = serde_json::from_value::<AllocationPayload>(json!({"estimationHours": "soon"}));
        assert!(err.is_err());
    }
}
