//! Escapade API: error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use escapade_core::error::EngineError;
use escapade_story::StoryError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migrations could not be applied.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The configured story file could not be loaded.
    #[error("story error: {0}")]
    Story(#[from] StoryError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `EngineError` for the JSON routes.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            EngineError::ProjectNotFound(_) => (StatusCode::NOT_FOUND, "project_not_found"),
            EngineError::NoActiveSession { .. } => (StatusCode::NOT_FOUND, "no_active_session"),
            EngineError::SessionConflict { .. } => (StatusCode::CONFLICT, "session_conflict"),
            EngineError::ConcurrencyConflict { .. } | EngineError::ProgressAlreadyExists { .. } => {
                (StatusCode::CONFLICT, "concurrency_conflict")
            }
            EngineError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            EngineError::SceneNotFound(_)
            | EngineError::InvalidSceneType { .. }
            | EngineError::UnsupportedMediaFormat(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "story_integrity_error")
            }
            EngineError::TransportError(_) | EngineError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use uuid::Uuid;

    fn status_of(err: EngineError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_missing_session_and_project_map_to_404() {
        assert_eq!(
            status_of(EngineError::NoActiveSession {
                phone_number: "whatsapp:+39".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::ProjectNotFound("manor".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_write_races_and_session_conflicts_map_to_409() {
        assert_eq!(
            status_of(EngineError::ConcurrencyConflict {
                progress_id: Uuid::new_v4(),
                expected: 1,
                actual: 2,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EngineError::SessionConflict {
                phone_number: "whatsapp:+39".into(),
                active_project_id: Uuid::new_v4(),
                requested_project_id: Uuid::new_v4(),
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_invalid_request_maps_to_400() {
        assert_eq!(
            status_of(EngineError::InvalidRequest("missing sender".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_integrity_and_infrastructure_map_to_500() {
        assert_eq!(
            status_of(EngineError::SceneNotFound(Uuid::new_v4())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(EngineError::Infrastructure("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
