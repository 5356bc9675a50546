//! Centralized error types for the tracker server

use clickup_core::CoreError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Per-field validation messages, rendered as `{"field": ["message"]}`
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Main server error type
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Identity provider error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Media storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for server operations
pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
    /// Single-field validation error
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        TrackerError::Validation(errors)
    }

    pub fn not_found(what: &str) -> Self {
        TrackerError::NotFound(format!("{} not found.", what))
    }

    /// Attach a domain error to the field it came from
    pub fn from_core(field: &str, err: CoreError) -> Self {
        Self::field(field, err.to_string())
    }
}

/// Unique and foreign key violations are client errors
impl From<sqlx::Error> for TrackerError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return TrackerError::NotFound("Not found.".to_string());
        }
        if let sqlx::Error::Database(db) = &err {
            let code = db.code().map(|c| c.into_owned());
            match code.as_deref() {
                Some("23505") => {
                    return TrackerError::Conflict(
                        db.constraint()
                            .map(|c| format!("Duplicate value violates {}", c))
                            .unwrap_or_else(|| "Duplicate value".to_string()),
                    )
                }
                Some("23503") => {
                    return TrackerError::BadRequest(
                        "Referenced object does not exist".to_string(),
                    )
                }
                Some("22P02") | Some("23514") => {
                    return TrackerError::BadRequest(db.message().to_string())
                }
                _ => {}
            }
        }
        TrackerError::Database(err)
    }
}

impl From<CoreError> for TrackerError {
    fn from(err: CoreError) -> Self {
        TrackerError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for TrackerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => describe_validation(e),
                })
                .collect();
            fields.insert(camel_case(field), messages);
        }
        TrackerError::Validation(fields)
    }
}

/// Payload fields are exchanged in camelCase
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' && !out.is_empty() {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl From<jsonwebtoken::errors::Error> for TrackerError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => {
                TrackerError::Unauthorized("Token is invalid or expired".to_string())
            }
            _ => TrackerError::Unauthorized("Given token not valid for any token type".to_string()),
        }
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::Upstream(err.to_string())
    }
}

fn describe_validation(err: &validator::ValidationError) -> String {
    match err.code.as_ref() {
        "length" => match (err.params.get("min"), err.params.get("max")) {
            (Some(min), Some(max)) => format!("Length must be between {} and {}.", min, max),
            (Some(min), None) => format!("Ensure this field has at least {} characters.", min),
            (None, Some(max)) => format!("Ensure this field has no more than {} characters.", max),
            _ => "Invalid length.".to_string(),
        },
        "range" => match (err.params.get("min"), err.params.get("max")) {
            (Some(min), Some(max)) => format!("Ensure this value is between {} and {}.", min, max),
            _ => "Value out of range.".to_string(),
        },
        "email" => "Enter a valid email address.".to_string(),
        "url" => "Enter a valid URL.".to_string(),
        "required" => "This field is required.".to_string(),
        other => format!("Invalid value ({}).", other),
    }
}
