use aws_sdk_dynamodb::error::SdkError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Error taxonomy shared by every service. Handlers branch on the variant,
/// never on message contents.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} is required")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A structured error returned by the ads platform, already unwrapped to
    /// its most user-readable message.
    #[error("{0}")]
    RemoteApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Unwraps a Graph API error body, preferring `error_user_msg` over the
    /// developer-facing `message`.
    pub fn from_graph_error(body: &serde_json::Value) -> Self {
        let error = &body["error"];
        let msg = error["error_user_msg"]
            .as_str()
            .or_else(|| error["message"].as_str())
            .unwrap_or("Unknown Facebook API error");
        ServiceError::RemoteApi(msg.to_string())
    }
}

// Helper function to map general DynamoDB errors
pub fn map_dynamo_error<E>(operation: &str, err: SdkError<E>) -> ServiceError {
    ServiceError::Internal(format!("DynamoDB {} error: {}", operation, err))
}

impl From<serde_dynamo::Error> for ServiceError {
    fn from(err: serde_dynamo::Error) -> Self {
        ServiceError::Internal(format!("DynamoDB serialization error: {}", err))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(format!("JSON serialization error: {}", err))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::RemoteApi(format!("Facebook API request failed: {}", err))
    }
}
