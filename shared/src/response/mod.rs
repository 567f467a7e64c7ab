use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::error::ServiceError;

/// Builds the uniform response envelope every handler returns, success or
/// failure: `{"data": ..., "message": "..."}` with permissive CORS headers.
pub fn envelope<T: Serialize>(status: StatusCode, data: T, message: &str) -> Response {
    let mut response = (
        status,
        Json(json!({
            "data": data,
            "message": message,
        })),
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".parse().unwrap());
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, "*".parse().unwrap());
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, "*".parse().unwrap());

    response
}

pub fn ok<T: Serialize>(data: T, message: &str) -> Response {
    envelope(StatusCode::OK, data, message)
}

/// Maps the shared error taxonomy onto envelope responses. Failures carry a
/// short human-readable message and a 4xx status; stack detail stays in the
/// logs.
pub fn error_response(err: &ServiceError) -> Response {
    let (status, message) = match err {
        ServiceError::Validation(field) => {
            tracing::warn!("Validation error: {} is required", field);
            (StatusCode::BAD_REQUEST, format!("{} is required", field))
        }
        ServiceError::Unauthorized(msg) => {
            tracing::warn!("Unauthorized: {}", msg);
            (StatusCode::UNAUTHORIZED, "Invalid Access Token".to_string())
        }
        ServiceError::NotFound(msg) => {
            tracing::warn!("Not found: {}", msg);
            (StatusCode::NOT_FOUND, msg.clone())
        }
        ServiceError::RemoteApi(msg) => {
            tracing::warn!("Facebook API error: {}", msg);
            (StatusCode::BAD_REQUEST, msg.clone())
        }
        ServiceError::Internal(msg) => {
            tracing::error!("Internal server error: {}", msg);
            (
                StatusCode::BAD_REQUEST,
                "Sorry, looks like something went wrong. Please message support for help."
                    .to_string(),
            )
        }
    };

    envelope(status, serde_json::Value::Null, &message)
}
