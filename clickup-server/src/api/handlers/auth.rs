//! Token refresh and sign-in handlers

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::api::extract::{JsonBody, ValidJson};
use crate::api::responses::ApiResponse;
use crate::api::ApiState;
use crate::error::{TrackerError, TrackerResult};

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordSignIn {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Exchange a refresh token for a new access token
pub async fn refresh_token(
    State(state): State<ApiState>,
    ValidJson(request): ValidJson<RefreshRequest>,
) -> TrackerResult<ApiResponse> {
    let access = state.tokens.refresh(&request.refresh)?;
    ApiResponse::ok(&json!({ "access": access }))
}

pub async fn google_sign_in(
    State(state): State<ApiState>,
    JsonBody(body): JsonBody<Value>,
) -> TrackerResult<ApiResponse> {
    let id_token = body
        .get("idToken")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| TrackerError::BadRequest("idToken Field required".to_string()))?;

    let result = state.sign_in.google(id_token).await;
    state.metrics.record_sign_in("google", result.is_ok());
    let signed_in = result?;
    info!("Google sign-in for employee {}", signed_in.id);

    Ok(ApiResponse::ok(&signed_in)?.with_message("Login successfully"))
}

pub async fn password_sign_in(
    State(state): State<ApiState>,
    ValidJson(request): ValidJson<PasswordSignIn>,
) -> TrackerResult<ApiResponse> {
    let result = state.sign_in.password(&request.email, &request.password).await;
    state.metrics.record_sign_in("password", result.is_ok());
    let signed_in = result?;
    info!("Password sign-in for employee {}", signed_in.id);

    Ok(ApiResponse::ok(&signed_in)?.with_message("Login successfully"))
}
