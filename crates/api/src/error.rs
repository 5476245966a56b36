use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::errors::DomainError;
use domain::models::VoteResponse;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The voter already has a vote in this poll; carries it when known.
    #[error("Already voted: {message}")]
    AlreadyVoted {
        message: String,
        existing: Option<VoteResponse>,
    },

    #[error("Poll closed: {0}")]
    PollClosed(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    existing_vote: Option<VoteResponse>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, existing_vote) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg, None)
            }
            ApiError::AlreadyVoted { message, existing } => {
                (StatusCode::CONFLICT, "already_voted", message, existing)
            }
            ApiError::PollClosed(msg) => (StatusCode::CONFLICT, "poll_closed", msg, None),
            ApiError::BackendUnavailable(msg) => {
                tracing::warn!("Backend unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "backend_unavailable",
                    "The poll backend is temporarily unavailable. Please retry.".into(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            existing_vote,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::PollNotFound(_) => ApiError::NotFound("Poll not found".into()),
            DomainError::OptionNotFound { .. } => {
                ApiError::NotFound("Option not found in this poll".into())
            }
            DomainError::AlreadyVoted { existing, .. } => ApiError::AlreadyVoted {
                message: "You have already voted in this poll".into(),
                existing: existing.map(|vote| VoteResponse::from(*vote)),
            },
            DomainError::PollClosed(_) => {
                ApiError::PollClosed("This poll is no longer accepting votes".into())
            }
            DomainError::Forbidden(msg) => ApiError::Forbidden(msg),
            DomainError::Unavailable(msg) => ApiError::BackendUnavailable(msg),
        }
    }
}
