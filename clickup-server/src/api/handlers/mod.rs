//! API request handlers

pub mod attachments;
pub mod auth;
pub mod people;
pub mod projects;
pub mod tickets;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;

use super::extract::AuthUser;
use super::ApiState;
use crate::error::{TrackerError, TrackerResult};

/// Uploaded file from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Text fields and files of a multipart form
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl UploadForm {
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }
}

fn multipart_error(err: MultipartError) -> TrackerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return TrackerError::PayloadTooLarge(err.body_text());
    }
    TrackerError::BadRequest(err.body_text())
}

pub async fn read_multipart(mut multipart: Multipart) -> TrackerResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(multipart_error)?;
                form.files.push(UploadedFile {
                    field: name,
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(multipart_error)?;
                form.fields.insert(name, text);
            }
        }
    }
    Ok(form)
}

/// Employee id of the signed-in user, for audit fields
pub async fn acting_employee(state: &ApiState, user: Option<AuthUser>) -> TrackerResult<Option<String>> {
    match user {
        Some(AuthUser(user)) => Ok(state
            .db
            .get_employee_by_user(&user.id)
            .await?
            .map(|employee| employee.id)),
        None => Ok(None),
    }
}

/// Validation message for a reference to a missing row
pub fn missing_reference(field: &str, id: &str) -> TrackerError {
    TrackerError::field(field, format!("Invalid pk \"{}\" - object does not exist.", id))
}
