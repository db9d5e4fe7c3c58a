use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // Bad input and duplicates share the same status on this API.
            AppError::InvalidInput(_) | AppError::Duplicate(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The `{code, type, message}` body shared by errors and bare acknowledgements
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApiMessage {
    pub code: u16,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: Option<String>,
}

impl ApiMessage {
    pub fn new(status: StatusCode, message: Option<String>) -> Self {
        Self {
            code: status.as_u16(),
            kind: status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
            message,
        }
    }
}

impl IntoResponse for ApiMessage {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::NotFound(msg)
            | AppError::InvalidInput(msg)
            | AppError::Duplicate(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg) => msg,
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "Database error");
                "An internal error occurred".to_string()
            }
            AppError::Internal(ref msg) => {
                tracing::error!(error = %msg, "Internal error");
                "An internal error occurred".to_string()
            }
        };

        ApiMessage::new(status, Some(message)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_input_and_duplicate_map_to_405() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            AppError::Duplicate("x".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_api_message_uses_reason_phrase() {
        let msg = ApiMessage::new(StatusCode::FORBIDDEN, Some("Access denied".into()));
        assert_eq!(msg.code, 403);
        assert_eq!(msg.kind, "Forbidden");

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Forbidden");
        assert_eq!(json["message"], "Access denied");
    }

    #[test]
    fn test_internal_errors_are_sanitized() {
        let response = AppError::Internal("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
