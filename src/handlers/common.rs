use crate::errors::{ApiError, ServiceError};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Success envelope shared by every cart endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "Result")]
    pub result: String,
    #[serde(rename = "ResponseMsg")]
    pub response_msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            response_code: StatusCode::OK.as_u16().to_string(),
            result: "true".to_string(),
            response_msg: message.into(),
            data: Some(data),
        }
    }
}

/// Standard success response
pub fn success_response<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(message, data))).into_response()
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Unreadable bodies are reported as 400 in the envelope.
pub fn map_json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
}
