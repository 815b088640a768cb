use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::origination::router::error_response;
use crate::workflows::origination::{ExportError, LoanServiceError, RepositoryError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Storage(RepositoryError),
    Export(ExportError),
    Workflow(LoanServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Storage(err) => write!(f, "storage error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
            AppError::Workflow(err) => write!(f, "workflow error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Storage(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::Workflow(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Workflow(err) => error_response(err),
            AppError::Storage(err) => error_response(LoanServiceError::Repository(err)),
            other => {
                let body = Json(json!({ "error": other.to_string() }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Storage(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<LoanServiceError> for AppError {
    fn from(value: LoanServiceError) -> Self {
        match value {
            LoanServiceError::Repository(source) => Self::Storage(source),
            other => Self::Workflow(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::origination::{ApplicationStatus, Role, TransitionError};

    #[test]
    fn workflow_errors_keep_their_http_status() {
        let forbidden = AppError::from(LoanServiceError::Forbidden {
            role: Role::Supervisor,
            action: "record committee decisions",
        });
        assert_eq!(forbidden.into_response().status(), StatusCode::FORBIDDEN);

        let closed = AppError::from(LoanServiceError::Closed {
            status: ApplicationStatus::Approved,
        });
        assert_eq!(closed.into_response().status(), StatusCode::CONFLICT);

        let comment = AppError::from(LoanServiceError::Transition(
            TransitionError::CommentRequired {
                to: ApplicationStatus::Supervised,
            },
        ));
        assert_eq!(
            comment.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn storage_errors_follow_router_mapping() {
        let conflict = AppError::from(RepositoryError::Conflict {
            expected: ApplicationStatus::Pending,
            actual: ApplicationStatus::UnderReview,
        });
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let missing = AppError::from(LoanServiceError::Repository(RepositoryError::NotFound));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let offline = AppError::from(RepositoryError::Unavailable("pool closed".to_string()));
        assert_eq!(
            offline.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn startup_failures_are_internal_errors() {
        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
