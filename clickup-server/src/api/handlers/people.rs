//! Role, employee and team member handlers

use axum::extract::{Path, Query, State};
use clickup_core::{DateFormat, ThemeMode, TimeFormat, ToastPosition};
use serde::Deserialize;
use serde_json::Value;

use super::missing_reference;
use crate::api::extract::{nullable, required, AuthUser, JsonBody};
use crate::api::present::WithMediaUrls;
use crate::api::responses::{ApiResponse, PageQuery};
use crate::api::ApiState;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{AllocatedUsers, Employee, Role};

// Roles

#[derive(Debug, Default, Deserialize)]
pub struct RolePayload {
    pub name: Option<String>,
    pub department: Option<String>,
}

async fn ensure_department(state: &ApiState, id: &str) -> TrackerResult<()> {
    if state.db.department_exists(id).await? {
        Ok(())
    } else {
        Err(missing_reference("department", id))
    }
}

pub async fn list_roles(
    State(state): State<ApiState>,
    _user: AuthUser,
    Query(query): Query<PageQuery>,
) -> TrackerResult<ApiResponse> {
    let total = state.db.count_roles().await?;
    let window = query.window(&state.config, total)?;
    let roles = state.db.list_roles(window.limit as i64, window.offset()).await?;
    ApiResponse::paginated(&roles, window.info(total))
}

pub async fn get_role(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    let role = state
        .db
        .get_role(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Role"))?;
    ApiResponse::ok(&role)
}

pub async fn create_role(
    State(state): State<ApiState>,
    _user: AuthUser,
    JsonBody(payload): JsonBody<RolePayload>,
) -> TrackerResult<ApiResponse> {
    let role = Role {
        id: clickup_core::generate_id(),
        name: required(payload.name, "name")?,
        department: required(payload.department, "department")?,
    };
    ensure_department(&state, &role.department).await?;
    state.db.save_role(&role).await?;
    ApiResponse::created(&role)
}

pub async fn update_role(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<RolePayload>,
) -> TrackerResult<ApiResponse> {
    let mut role = state
        .db
        .get_role(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Role"))?;
    if let Some(name) = payload.name {
        role.name = name;
    }
    if let Some(department) = payload.department {
        ensure_department(&state, &department).await?;
        role.department = department;
    }
    state.db.save_role(&role).await?;
    ApiResponse::ok(&role)
}

pub async fn delete_role(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    if !state.db.delete_role(&id).await? {
        return Err(TrackerError::not_found("Role"));
    }
    Ok(ApiResponse::empty())
}

// Employees

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePayload {
    pub user: Option<String>,
    pub employee_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub role: Option<Option<String>>,
    pub skill_set: Option<Vec<String>>,
    pub theme: Option<ThemeMode>,
    pub date_format: Option<DateFormat>,
    pub time_format: Option<TimeFormat>,
    pub toast_position: Option<ToastPosition>,
    pub contact_number: Option<String>,
    pub education: Option<Vec<String>>,
}

impl EmployeePayload {
    /// Overlay the provided fields onto `employee`
    fn apply(self, employee: &mut Employee) {
        if let Some(employee_id) = self.employee_id {
            employee.employee_id = employee_id;
        }
        if let Some(role) = self.role {
            employee.role = role;
        }
        if let Some(skills) = self.skill_set {
            employee.skill_set = skills;
        }
        if let Some(theme) = self.theme {
            employee.theme = theme;
        }
        if let Some(format) = self.date_format {
            employee.date_format = format;
        }
        if let Some(format) = self.time_format {
            employee.time_format = format;
        }
        if let Some(position) = self.toast_position {
            employee.toast_position = position;
        }
        if let Some(contact) = self.contact_number {
            employee.contact_number = contact;
        }
        if let Some(education) = self.education {
            employee.education = education;
        }
    }
}

async fn ensure_role(state: &ApiState, role: Option<&str>) -> TrackerResult<()> {
    match role {
        Some(id) if state.db.get_role(id).await?.is_none() => Err(missing_reference("role", id)),
        _ => Ok(()),
    }
}

pub async fn list_employees(
    State(state): State<ApiState>,
    _user: AuthUser,
    Query(query): Query<PageQuery>,
) -> TrackerResult<ApiResponse> {
    let total = state.db.count_employees().await?;
    let window = query.window(&state.config, total)?;
    let employees = state
        .db
        .list_employees(window.limit as i64, window.offset())
        .await?;
    ApiResponse::paginated(&employees.with_media_urls(&state.media), window.info(total))
}

pub async fn get_employee(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    let employee = state
        .db
        .get_employee(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Employee"))?;
    ApiResponse::ok(&employee.with_media_urls(&state.media))
}

pub async fn create_employee(
    State(state): State<ApiState>,
    _user: AuthUser,
    JsonBody(payload): JsonBody<EmployeePayload>,
) -> TrackerResult<ApiResponse> {
    let user = required(payload.user.clone(), "user")?;
    required(payload.employee_id.as_ref(), "employeeId")?;
    required(payload.role.clone().flatten(), "role")?;
    required(payload.contact_number.as_ref(), "contactNumber")?;

    if state.db.get_user(&user).await?.is_none() {
        return Err(missing_reference("user", &user));
    }
    ensure_role(&state, payload.role.clone().flatten().as_deref()).await?;

    let mut employee = Employee::for_user(clickup_core::generate_id(), &user);
    payload.apply(&mut employee);
    state.db.save_employee(&employee).await?;
    ApiResponse::created(&employee.with_media_urls(&state.media))
}

pub async fn update_employee(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<EmployeePayload>,
) -> TrackerResult<ApiResponse> {
    let mut employee = state
        .db
        .get_employee(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Employee"))?;
    if let Some(user) = &payload.user {
        if user != &employee.user {
            return Err(TrackerError::field("user", "The user of an employee cannot change."));
        }
    }
    ensure_role(&state, payload.role.clone().flatten().as_deref()).await?;

    payload.apply(&mut employee);
    state.db.save_employee(&employee).await?;
    ApiResponse::ok(&employee.with_media_urls(&state.media))
}

pub async fn delete_employee(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    if !state.db.delete_employee(&id).await? {
        return Err(TrackerError::not_found("Employee"));
    }
    Ok(ApiResponse::empty())
}

// Team members

/// Team member overview, optionally narrowed by `params.projectId`
pub async fn team_members(
    State(state): State<ApiState>,
    _user: AuthUser,
    body: Option<JsonBody<Value>>,
) -> TrackerResult<ApiResponse> {
    let body = body.map(|JsonBody(value)| value).unwrap_or(Value::Null);
    let project_id = body
        .get("params")
        .and_then(|params| params.get("projectId"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty());

    let members = state.db.team_members(project_id).await?;
    ApiResponse::allocated_users(&AllocatedUsers::new(members.with_media_urls(&state.media)))
}
