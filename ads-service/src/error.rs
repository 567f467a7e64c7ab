use axum::response::{IntoResponse, Response};

use adflow_shared::error::ServiceError;
use adflow_shared::response::error_response;

/// Service-level error: the shared taxonomy rendered as the uniform envelope.
#[derive(Debug)]
pub struct AppError(pub ServiceError);

impl AppError {
    pub fn validation(field: impl Into<String>) -> Self {
        AppError(ServiceError::Validation(field.into()))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError(ServiceError::NotFound(msg.into()))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_response(&self.0)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
