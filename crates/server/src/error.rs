use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use services::services::{documents::DocumentError, numbering::NumberingError};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Numbering(#[from] NumberingError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] JsonRejection),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Document(err) => match err {
                DocumentError::Validation(_) | DocumentError::InsufficientStock { .. } => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                DocumentError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
                DocumentError::DuplicateNumber { .. } | DocumentError::InvalidStatus { .. } => {
                    (StatusCode::CONFLICT, err.to_string())
                }
                DocumentError::Numbering(inner) => numbering_status(inner),
                DocumentError::Database(inner) => database_status(inner),
            },
            ApiError::Numbering(err) => numbering_status(err),
            ApiError::Database(err) => database_status(err),
            ApiError::Json(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        }
    }
}

fn numbering_status(err: &NumberingError) -> (StatusCode, String) {
    match err {
        NumberingError::InvalidKind(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        NumberingError::PersistenceUnavailable(_) | NumberingError::SequenceExhausted { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn database_status(err: &sqlx::Error) -> (StatusCode, String) {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            (StatusCode::CONFLICT, "Record already exists".to_string())
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use utils::document_number::DocumentKind;

    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::from(DocumentError::NotFound {
                    kind: DocumentKind::Receipt,
                    id: 3,
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(DocumentError::DuplicateNumber {
                    kind: DocumentKind::Delivery,
                    number: "DEL-2024-001".to_string(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(DocumentError::Validation("bad".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(NumberingError::PersistenceUnavailable(
                    sqlx::Error::PoolTimedOut,
                )),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let (_, message) = ApiError::from(sqlx::Error::PoolTimedOut).status_and_message();
        assert_eq!(message, "Internal server error");
    }
}
