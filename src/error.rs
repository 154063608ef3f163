use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShareError {
    /// The id is unknown or the file has expired.
    #[error("{0} not found")]
    NotFound(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<rusqlite::Error> for ShareError {
    fn from(e: rusqlite::Error) -> Self {
        ShareError::StorageFailure(e.to_string())
    }
}

impl From<std::io::Error> for ShareError {
    fn from(e: std::io::Error) -> Self {
        ShareError::StorageFailure(e.to_string())
    }
}

// Malformed or oversized bodies are the client's fault; anything else is a
// broken upload stream.
impl From<MultipartError> for ShareError {
    fn from(e: MultipartError) -> Self {
        if e.status().is_client_error() {
            ShareError::InvalidInput(e.body_text())
        } else {
            ShareError::StorageFailure(e.body_text())
        }
    }
}

pub type Result<T> = std::result::Result<T, ShareError>;

impl IntoResponse for ShareError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ShareError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ShareError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ShareError::StorageFailure(msg) => {
                tracing::error!("Storage failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage failure".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ShareError::NotFound("File".to_string());
        assert_eq!(err.to_string(), "File not found");
    }

    #[test]
    fn test_invalid_input_display() {
        let err = ShareError::InvalidInput("expiryDays must be at least 1".to_string());
        assert_eq!(err.to_string(), "invalid input: expiryDays must be at least 1");
    }

    #[test]
    fn test_from_rusqlite_error() {
        let err: ShareError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, ShareError::StorageFailure(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ShareError::NotFound("File".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ShareError::InvalidInput("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ShareError::StorageFailure("disk".into())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
