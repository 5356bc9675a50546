//! Request extractors

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use validator::Validate;

use super::ApiState;
use crate::auth::TokenType;
use crate::error::TrackerError;
use crate::models::User;

/// The account behind a valid `Authorization: Bearer <access>` header
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<ApiState> for AuthUser {
    type Rejection = TrackerError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                TrackerError::Unauthorized(
                    "Authentication credentials were not provided.".to_string(),
                )
            })?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                TrackerError::Unauthorized("Authorization header must contain a Bearer token".to_string())
            })?;

        let claims = state.tokens.verify(token, TokenType::Access)?;
        let user = state
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| TrackerError::Unauthorized("User not found".to_string()))?;
        if !user.is_active {
            return Err(TrackerError::Unauthorized("User is inactive".to_string()));
        }
        Ok(AuthUser(user))
    }
}

/// JSON body that is deserialized and then validated
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = TrackerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// JSON body without validation rules, with enveloped rejections
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = TrackerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(JsonBody(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> TrackerError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return TrackerError::PayloadTooLarge(rejection.body_text());
    }
    TrackerError::BadRequest(rejection.body_text())
}

/// Distinguish an absent field (`None`) from an explicit null (`Some(None)`)
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Truthiness of a loosely typed JSON flag
pub fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Value of a required field in a create payload
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, TrackerError> {
    value.ok_or_else(|| TrackerError::field(field, "This field is required."))
}
