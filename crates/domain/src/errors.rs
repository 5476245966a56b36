//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::models::Vote;

/// Errors produced by poll, vote, and identity operations.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Input rejected before any store call.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Poll not found: {0}")]
    PollNotFound(Uuid),

    #[error("Option {option_id} not found in poll {poll_id}")]
    OptionNotFound { poll_id: Uuid, option_id: Uuid },

    /// Conflict path of the ledger's conditional insert.
    ///
    /// `existing` carries the committed vote when the store could return it.
    #[error("Voter has already voted in poll {poll_id}")]
    AlreadyVoted {
        poll_id: Uuid,
        existing: Option<Box<Vote>>,
    },

    /// The poll is expired or was closed by its creator.
    #[error("Poll {0} is no longer accepting votes")]
    PollClosed(Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Any store or channel transport failure.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl DomainError {
    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Unavailable(_))
    }

    /// Short machine-readable reason, used for metric labels and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation",
            DomainError::PollNotFound(_) => "poll_not_found",
            DomainError::OptionNotFound { .. } => "option_not_found",
            DomainError::AlreadyVoted { .. } => "already_voted",
            DomainError::PollClosed(_) => "poll_closed",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect();
        messages.sort();

        let message = match messages.len() {
            0 => "Invalid input".to_string(),
            1 => messages.remove(0),
            _ => messages.join("; "),
        };

        DomainError::Validation(message)
    }
}
