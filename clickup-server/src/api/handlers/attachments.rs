//! Attachment handlers for tickets and allocations

use axum::extract::{Multipart, Path, State};
use tracing::info;

use super::read_multipart;
use crate::api::present::WithMediaUrls;
use crate::api::responses::ApiResponse;
use crate::api::ApiState;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{Attachment, AttachmentOwner};

async fn ensure_owner(state: &ApiState, owner: AttachmentOwner, id: &str) -> TrackerResult<()> {
    if state.db.attachment_owner_exists(owner, id).await? {
        Ok(())
    } else {
        Err(TrackerError::not_found(owner.label()))
    }
}

async fn list(state: ApiState, owner: AttachmentOwner, owner_id: String) -> TrackerResult<ApiResponse> {
    ensure_owner(&state, owner, &owner_id).await?;
    let attachments = state.db.list_attachments(owner, &owner_id).await?;
    ApiResponse::ok(&attachments.with_media_urls(&state.media))
}

/// Store every `files` part under the owner's media directory
async fn upload(
    state: ApiState,
    owner: AttachmentOwner,
    owner_id: String,
    multipart: Multipart,
) -> TrackerResult<ApiResponse> {
    ensure_owner(&state, owner, &owner_id).await?;
    let form = read_multipart(multipart).await?;
    let kind = form
        .fields
        .get("type")
        .filter(|kind| !kind.is_empty())
        .cloned()
        .ok_or_else(|| TrackerError::field("type", "This field is required."))?;
    let files: Vec<_> = form.files.iter().filter(|f| f.field == "files").collect();
    if files.is_empty() {
        return Err(TrackerError::field("files", "No file was submitted."));
    }

    let mut created = Vec::with_capacity(files.len());
    for file in files {
        let stored = state
            .media
            .save_upload(owner.media_dir(), &file.file_name, &file.bytes)
            .await?;
        let attachment = Attachment {
            id: clickup_core::generate_id(),
            owner,
            owner_id: owner_id.clone(),
            kind: kind.clone(),
            files: stored,
        };
        state.db.insert_attachment(&attachment).await?;
        created.push(attachment);
    }
    info!("Stored {} attachments for {} {}", created.len(), owner.field(), owner_id);
    ApiResponse::created(&created.with_media_urls(&state.media))
}

async fn get(
    state: ApiState,
    owner: AttachmentOwner,
    owner_id: String,
    id: String,
) -> TrackerResult<ApiResponse> {
    let attachment = state
        .db
        .get_attachment(owner, &owner_id, &id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Attachment"))?;
    ApiResponse::ok(&attachment.with_media_urls(&state.media))
}

/// Remove the row, then the stored file
async fn delete(
    state: ApiState,
    owner: AttachmentOwner,
    owner_id: String,
    id: String,
) -> TrackerResult<ApiResponse> {
    let attachment = state
        .db
        .get_attachment(owner, &owner_id, &id)
        .await?
        .ok_or_else(|| TrackerError::not_found("Attachment"))?;
    state.db.delete_attachment(owner, &attachment.id).await?;
    state.media.delete(&attachment.files).await?;
    Ok(ApiResponse::empty())
}

pub async fn list_ticket_attachments(
    State(state): State<ApiState>,
    Path(ticket_id): Path<String>,
) -> TrackerResult<ApiResponse> {
    list(state, AttachmentOwner::Ticket, ticket_id).await
}

pub async fn upload_ticket_attachments(
    State(state): State<ApiState>,
    Path(ticket_id): Path<String>,
    multipart: Multipart,
) -> TrackerResult<ApiResponse> {
    upload(state, AttachmentOwner::Ticket, ticket_id, multipart).await
}

pub async fn get_ticket_attachment(
    State(state): State<ApiState>,
    Path((ticket_id, id)): Path<(String, String)>,
) -> TrackerResult<ApiResponse> {
    get(state, AttachmentOwner::Ticket, ticket_id, id).await
}

pub async fn delete_ticket_attachment(
    State(state): State<ApiState>,
    Path((ticket_id, id)): Path<(String, String)>,
) -> TrackerResult<ApiResponse> {
    delete(state, AttachmentOwner::Ticket, ticket_id, id).await
}

pub async fn list_allocation_attachments(
    State(state): State<ApiState>,
    Path(allocation_id): Path<String>,
) -> TrackerResult<ApiResponse> {
    list(state, AttachmentOwner::Allocation, allocation_id).await
}

pub async fn upload_allocation_attachments(
    State(state): State<ApiState>,
    Path(allocation_id): Path<String>,
    multipart: Multipart,
) -> TrackerResult<ApiResponse> {
    upload(state, AttachmentOwner::Allocation, allocation_id, multipart).await
}

pub async fn get_allocation_attachment(
    State(state): State<ApiState>,
    Path((allocation_id, id)): Path<(String, String)>,
) -> TrackerResult<ApiResponse> {
    get(state, AttachmentOwner::Allocation, allocation_id, id).await
}

pub async fn delete_allocation_attachment(
    State(state): State<ApiState>,
    Path((allocation_id, id)): Path<(String, String)>,
) -> TrackerResult<ApiResponse> {
    delete(state, AttachmentOwner::Allocation, allocation_id, id).await
}
