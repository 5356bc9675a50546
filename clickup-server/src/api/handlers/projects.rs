//! Project, list, folder and sprint handlers

use axum::extract::{Multipart, Path, Query, State};
use chrono::Utc;
use clickup_core::validators::check_short_code;
use clickup_core::SprintStatus;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{missing_reference, read_multipart};
use crate::api::extract::{is_truthy, required, AuthUser, JsonBody, ValidJson};
use crate::api::present::WithMediaUrls;
use crate::api::responses::{ApiResponse, PageQuery};
use crate::api::ApiState;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{Folder, ListSummary, Project, TaskList};
use crate::services::SprintPlanRequest;

async fn ensure_project(state: &ApiState, id: &str) -> TrackerResult<()> {
    match state.db.get_project(id).await? {
        Some(_) => Ok(()),
        None => Err(missing_reference("project", id)),
    }
}

// Reference data

pub async fn random_joke(State(state): State<ApiState>) -> TrackerResult<ApiResponse> {
    let joke = state
        .db
        .random_joke()
        .await?
        .ok_or_else(|| TrackerError::not_found("Joke"))?;
    Ok(ApiResponse::ok(&joke.joke)?.with_message("Jokes Fetched Successfully"))
}

pub async fn project_icons(
    State(state): State<ApiState>,
    _user: AuthUser,
) -> TrackerResult<ApiResponse> {
    let colors = state.db.list_project_icons().await?;
    ApiResponse::ok(&json!({ "colors": colors, "icons": [] }))
}

// Projects

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPayload {
    pub name: Option<String>,
    pub erp_id: Option<i32>,
    pub short_code: Option<String>,
}

fn checked_short_code(code: String) -> TrackerResult<String> {
    check_short_code(&code).map_err(|e| TrackerError::from_core("shortCode", e))?;
    Ok(code)
}

/// Projects with their sprints, folders and loose lists
pub async fn list_projects(
    State(state): State<ApiState>,
    _user: AuthUser,
    Query(query): Query<PageQuery>,
) -> TrackerResult<ApiResponse> {
    let total = state.db.count_projects().await?;
    let window = query.window(&state.config, total)?;
    let projects = state.db.list_projects(window.limit as i64, window.offset()).await?;
    let details = state.db.project_details(projects).await?;
    ApiResponse::paginated(&details.with_media_urls(&state.media), window.info(total))
}

pub async fn get_project(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    let project = state
        .db
        .get_project(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Project"))?;
    let detail = state
        .db
        .project_details(vec![project])
        .await?
        .pop()
        .ok_or_else(|| TrackerError::not_found("Project"))?;
    ApiResponse::ok(&detail.with_media_urls(&state.media))
}

pub async fn create_project(
    State(state): State<ApiState>,
    _user: AuthUser,
    JsonBody(payload): JsonBody<ProjectPayload>,
) -> TrackerResult<ApiResponse> {
    let project = Project {
        id: clickup_core::generate_id(),
        name: required(payload.name, "name")?,
        erp_id: required(payload.erp_id, "erpId")?,
        short_code: checked_short_code(required(payload.short_code, "shortCode")?)?,
        logo: String::new(),
    };
    state.db.insert_project(&project).await?;
    info!("Created project {} ({})", project.name, project.short_code);
    ApiResponse::created(&project.with_media_urls(&state.media))
}

pub async fn update_project(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<ProjectPayload>,
) -> TrackerResult<ApiResponse> {
    let mut project = state
        .db
        .get_project(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Project"))?;
    if let Some(name) = payload.name {
        project.name = name;
    }
    if let Some(erp_id) = payload.erp_id {
        project.erp_id = erp_id;
    }
    if let Some(code) = payload.short_code {
        project.short_code = checked_short_code(code)?;
    }
    state.db.update_project(&project).await?;
    ApiResponse::ok(&project.with_media_urls(&state.media))
}

pub async fn delete_project(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    if !state.db.delete_project(&id).await? {
        return Err(TrackerError::not_found("Project"));
    }
    Ok(ApiResponse::empty())
}

/// Replace the project logo with the uploaded `logo` file
pub async fn upload_project_logo(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> TrackerResult<ApiResponse> {
    let mut project = state
        .db
        .get_project(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Project"))?;
    let form = read_multipart(multipart).await?;
    let logo = form
        .file("logo")
        .ok_or_else(|| TrackerError::field("logo", "No file was submitted."))?;

    let stored = state
        .media
        .save_upload("project/logo", &logo.file_name, &logo.bytes)
        .await?;
    let previous = std::mem::replace(&mut project.logo, stored);
    state.db.update_project(&project).await?;
    if !previous.is_empty() {
        state.media.delete(&previous).await?;
    }
    ApiResponse::ok(&project.with_media_urls(&state.media))
}

// Lists

#[derive(Debug, Default, Deserialize)]
pub struct ListPayload {
    pub name: Option<String>,
    pub project: Option<String>,
    /// Create a folder holding one new list per entry of `lists`
    pub folder: Option<Value>,
    pub lists: Option<Vec<String>>,
}

pub async fn list_lists(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> TrackerResult<ApiResponse> {
    let total = state.db.count_lists().await?;
    let window = query.window(&state.config, total)?;
    let lists: Vec<ListSummary> = state
        .db
        .list_lists(window.limit as i64, window.offset())
        .await?
        .iter()
        .map(TaskList::summary)
        .collect();
    ApiResponse::paginated(&lists, window.info(total))
}

pub async fn get_list(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    let list = state
        .db
        .get_list(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("List"))?;
    ApiResponse::ok(&list.summary())
}

pub async fn create_list(
    State(state): State<ApiState>,
    JsonBody(payload): JsonBody<ListPayload>,
) -> TrackerResult<ApiResponse> {
    let name = required(payload.name, "name")?;
    let project = required(payload.project, "project")?;
    ensure_project(&state, &project).await?;

    if payload.folder.as_ref().map_or(false, is_truthy) {
        let names = payload.lists.unwrap_or_default();
        let folder = state.db.create_folder_with_lists(&name, &project, &names).await?;
        info!("Created folder {} with {} lists", folder.id, folder.list.len());
        return ApiResponse::created(&folder);
    }

    let list = TaskList {
        id: clickup_core::generate_id(),
        name,
        project,
    };
    state.db.insert_list(&list).await?;
    ApiResponse::created(&list)
}

pub async fn update_list(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<ListPayload>,
) -> TrackerResult<ApiResponse> {
    let mut list = state
        .db
        .get_list(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("List"))?;
    if let Some(name) = payload.name {
        list.name = name;
    }
    if let Some(project) = payload.project {
        ensure_project(&state, &project).await?;
        list.project = project;
    }
    state.db.update_list(&list).await?;
    ApiResponse::ok(&list)
}

pub async fn delete_list(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    if !state.db.delete_list(&id).await? {
        return Err(TrackerError::not_found("List"));
    }
    Ok(ApiResponse::empty())
}

// Sprints

#[derive(Debug, Default, Deserialize)]
pub struct SprintPatch {
    pub name: Option<String>,
    pub active: Option<bool>,
    pub status: Option<SprintStatus>,
}

pub async fn list_sprints(
    State(state): State<ApiState>,
    _user: AuthUser,
    Query(query): Query<PageQuery>,
) -> TrackerResult<ApiResponse> {
    let total = state.db.count_sprints().await?;
    let window = query.window(&state.config, total)?;
    let sprints = state.db.list_sprints(window.limit as i64, window.offset()).await?;
    ApiResponse::paginated(&sprints, window.info(total))
}

pub async fn get_sprint(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    let sprint = state
        .db
        .get_sprint(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Sprint"))?;
    ApiResponse::ok(&sprint)
}

/// Generate a batch of sprints for a project
pub async fn create_sprints(
    State(state): State<ApiState>,
    _user: AuthUser,
    ValidJson(request): ValidJson<SprintPlanRequest>,
) -> TrackerResult<ApiResponse> {
    let sprints = request.execute(&state.db, Utc::now().date_naive()).await?;
    ApiResponse::created(&sprints)
}

pub async fn update_sprint(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<SprintPatch>,
) -> TrackerResult<ApiResponse> {
    let mut sprint = state
        .db
        .get_sprint(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Sprint"))?;
    if let Some(name) = patch.name {
        sprint.name = name;
    }
    if let Some(active) = patch.active {
        sprint.active = active;
    }
    if let Some(status) = patch.status {
        sprint.status = status;
    }
    state.db.update_sprint(&sprint).await?;
    ApiResponse::ok(&sprint)
}

pub async fn delete_sprint(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    if !state.db.delete_sprint(&id).await? {
        return Err(TrackerError::not_found("Sprint"));
    }
    Ok(ApiResponse::empty())
}

// Folders

#[derive(Debug, Default, Deserialize)]
pub struct FolderPayload {
    pub name: Option<String>,
    pub project: Option<String>,
    /// Ids of existing lists of the same project
    pub lists: Option<Vec<String>>,
}

async fn ensure_project_lists(state: &ApiState, project: &str, lists: &[String]) -> TrackerResult<()> {
    match state.db.foreign_lists(project, lists).await?.first() {
        Some(id) => Err(missing_reference("lists", id)),
        None => Ok(()),
    }
}

/// Lists that must belong to the folder's project after an update
///
/// New lists are always checked; kept lists only when the project moves.
fn lists_to_check(existing: &Folder, project: Option<&str>, lists: Option<&[String]>) -> Vec<String> {
    match lists {
        Some(lists) => lists.to_vec(),
        None if project.is_some_and(|p| p != existing.project) => {
            existing.list.iter().map(|l| l.id.clone()).collect()
        }
        None => Vec::new(),
    }
}

pub async fn list_folders(
    State(state): State<ApiState>,
    _user: AuthUser,
    Query(query): Query<PageQuery>,
) -> TrackerResult<ApiResponse> {
    let total = state.db.count_folders().await?;
    let window = query.window(&state.config, total)?;
    let folders = state.db.list_folders(window.limit as i64, window.offset()).await?;
    ApiResponse::paginated(&folders, window.info(total))
}

pub async fn get_folder(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    let folder = state
        .db
        .get_folder(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Folder"))?;
    ApiResponse::ok(&folder)
}

pub async fn create_folder(
    State(state): State<ApiState>,
    _user: AuthUser,
    JsonBody(payload): JsonBody<FolderPayload>,
) -> TrackerResult<ApiResponse> {
    let name = required(payload.name, "name")?;
    let project = required(payload.project, "project")?;
    let lists = payload.lists.unwrap_or_default();
    ensure_project(&state, &project).await?;
    ensure_project_lists(&state, &project, &lists).await?;

    let id = clickup_core::generate_id();
    state.db.save_folder(&id, &name, &project, Some(&lists)).await?;
    let folder = state
        .db
        .get_folder(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Folder"))?;
    ApiResponse::created(&folder)
}

pub async fn update_folder(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<FolderPayload>,
) -> TrackerResult<ApiResponse> {
    let existing = state
        .db
        .get_folder(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Folder"))?;
    if let Some(project) = &payload.project {
        ensure_project(&state, project).await?;
    }
    let checked = lists_to_check(&existing, payload.project.as_deref(), payload.lists.as_deref());
    let name = payload.name.unwrap_or(existing.name);
    let project = payload.project.unwrap_or(existing.project);
    ensure_project_lists(&state, &project, &checked).await?;

    state
        .db
        .save_folder(&id, &name, &project, payload.lists.as_deref())
        .await?;
    let folder = state
        .db
        .get_folder(&id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Folder"))?;
    ApiResponse::ok(&folder)
}

pub async fn delete_folder(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> TrackerResult<ApiResponse> {
    if !state.db.delete_folder(&id).await? {
        return Err(TrackerError::not_found("Folder"));
    }
    Ok(ApiResponse::empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder() -> Folder {
        Folder {
            id: "f1".to_string(),
            name: "Sprint work".to_string(),
            project: "p1".to_string(),
            list: vec![ListSummary {
                id: "l1".to_string(),
                name: "Backlog".to_string(),
            }],
        }
    }

    #[test]
    fn moving_a_folder_rechecks_its_current_lists() {
        let checked = lists_to_check(&folder(), Some("p2"), None);
        assert_eq!(checked, vec!["l1".to_string()]);
    }

    #[test]
    fn given_lists_are_always_checked() {
        let lists = vec!["l2".to_string()];
        assert_eq!(lists_to_check(&folder(), None, Some(&lists)), lists);
        assert_eq!(lists_to_check(&folder(), Some("p2"), Some(&lists)), lists);
    }

    #[test]
    fn renames_in_place_skip_list_checks() {
        assert!(lists_to_check(&folder(), None, None).is_empty());
        assert!(lists_to_check(&folder(), Some("p1"), None).is_empty());
    }
}
