//! Response envelope and pagination
//!
//! Every body is wrapped as
//! `{statusCode, success, message?, data? | allocatedUsers? | errors?, pagination?}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::error;

use crate::config::ApiConfig;
use crate::error::{TrackerError, TrackerResult};

/// Page metadata attached to list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: u32,
    pub limit: u32,
    pub total: i64,
}

#[derive(Debug)]
enum Payload {
    Empty,
    Data(Value),
    AllocatedUsers(Value),
}

#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    message: Option<String>,
    payload: Payload,
    pagination: Option<PageInfo>,
}

fn to_value<T: Serialize>(data: &T) -> TrackerResult<Value> {
    serde_json::to_value(data)
        .map_err(|e| TrackerError::Other(anyhow::anyhow!("failed to serialize response: {}", e)))
}

impl ApiResponse {
    fn with_payload(status: StatusCode, payload: Payload) -> Self {
        Self {
            status,
            message: None,
            payload,
            pagination: None,
        }
    }

    pub fn ok<T: Serialize>(data: &T) -> TrackerResult<Self> {
        Ok(Self::with_payload(StatusCode::OK, Payload::Data(to_value(data)?)))
    }

    pub fn created<T: Serialize>(data: &T) -> TrackerResult<Self> {
        Ok(Self::with_payload(StatusCode::CREATED, Payload::Data(to_value(data)?)))
    }

    /// Body-less success, used for deletes
    pub fn empty() -> Self {
        Self::with_payload(StatusCode::OK, Payload::Empty)
    }

    pub fn paginated<T: Serialize>(data: &T, page: PageInfo) -> TrackerResult<Self> {
        let mut response = Self::ok(data)?;
        response.pagination = Some(page);
        Ok(response)
    }

    pub fn allocated_users<T: Serialize>(data: &T) -> TrackerResult<Self> {
        Ok(Self::with_payload(
            StatusCode::OK,
            Payload::AllocatedUsers(to_value(data)?),
        ))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn into_body(self) -> Value {
        let mut body = Map::new();
        body.insert("statusCode".into(), Value::from(self.status.as_u16()));
        body.insert("success".into(), Value::Bool(!is_error(self.status)));
        if let Some(message) = self.message {
            body.insert("message".into(), Value::String(message));
        }
        match self.payload {
            Payload::Empty => {}
            Payload::Data(data) => {
                body.insert("data".into(), data);
            }
            Payload::AllocatedUsers(data) => {
                body.insert("allocatedUsers".into(), data);
            }
        }
        if let Some(page) = self.pagination {
            if let Ok(page) = serde_json::to_value(page) {
                body.insert("pagination".into(), page);
            }
        }
        Value::Object(body)
    }
}

fn is_error(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self.into_body())).into_response()
    }
}

fn error_body(status: StatusCode, errors: Value) -> Response {
    let body = serde_json::json!({
        "statusCode": status.as_u16(),
        "success": false,
        "errors": errors,
    });
    (status, Json(body)).into_response()
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrackerError::Validation(_) | TrackerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            TrackerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Conflict(_) => StatusCode::CONFLICT,
            TrackerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            TrackerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            TrackerError::Database(_) | TrackerError::Io(_) | TrackerError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        match self {
            TrackerError::Validation(fields) => {
                let errors = serde_json::to_value(fields).unwrap_or(Value::Null);
                error_body(status, errors)
            }
            err if status.is_server_error() => {
                error!("Request failed: {}", err);
                let message = match status {
                    StatusCode::BAD_GATEWAY => err.to_string(),
                    _ => "Internal server error".to_string(),
                };
                error_body(status, Value::String(message))
            }
            err => error_body(status, Value::String(err.to_string())),
        }
    }
}

/// `?page=&limit=` query parameters
///
/// Kept as text so a malformed page can be reported as an invalid page
/// instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Resolved page bounds for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub limit: u32,
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    pub fn info(&self, total: i64) -> PageInfo {
        PageInfo {
            current_page: self.page,
            limit: self.limit,
            total,
        }
    }
}

impl PageQuery {
    /// Check the requested page against `total` rows
    ///
    /// Page 1 always exists; any other page must start within the rows.
    pub fn window(&self, config: &ApiConfig, total: i64) -> TrackerResult<PageWindow> {
        let limit = self
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<u32>().ok())
            .filter(|l| *l > 0)
            .map(|l| l.min(config.max_page_size))
            .unwrap_or(config.default_page_size);
        let page = match self.page.as_deref() {
            None => 1,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(invalid_page)?,
        };

        let window = PageWindow { page, limit };
        if page > 1 && window.offset() >= total {
            return Err(invalid_page());
        }
        Ok(window)
    }
}

pub fn invalid_page() -> TrackerError {
    TrackerError::NotFound("Invalid page.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn query(page: Option<&str>, limit: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    async fn body_of(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn page_defaults_and_caps() {
        let config = ApiConfig::default();
        assert_eq!(
            query(None, None).window(&config, 0).unwrap(),
            PageWindow { page: 1, limit: 10 }
        );
        assert_eq!(query(None, Some("500")).window(&config, 0).unwrap().limit, 100);
        assert_eq!(query(None, Some("abc")).window(&config, 0).unwrap().limit, 10);
    }

    #[test]
    fn out_of_range_pages_are_not_found() {
        let config = ApiConfig::default();
        assert_eq!(query(Some("2"), Some("5")).window(&config, 10).unwrap().offset(), 5);
        assert!(matches!(
            query(Some("3"), Some("5")).window(&config, 10),
            Err(TrackerError::NotFound(_))
        ));
        assert!(query(Some("0"), None).window(&config, 10).is_err());
        assert!(query(Some("x"), None).window(&config, 10).is_err());
    }

    #[tokio::test]
    async fn success_envelope_carries_data_and_pagination() {
        let page = PageWindow { page: 1, limit: 10 }.info(1);
        let response = ApiResponse::paginated(&vec!["a"], page)
            .unwrap()
            .with_message("Fetched")
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_of(response).await;
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Fetched");
        assert_eq!(body["data"][0], "a");
        assert_eq!(body["pagination"]["currentPage"], 1);
        assert_eq!(body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn empty_success_has_no_data() {
        let body = body_of(ApiResponse::empty().into_response()).await;
        assert_eq!(body["statusCode"], 200);
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn errors_are_enveloped() {
        let response = TrackerError::field("name", "This field is required.").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_of(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["name"][0], "This field is required.");

        let body = body_of(invalid_page().into_response()).await;
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["errors"], "Invalid page.");
    }
}
