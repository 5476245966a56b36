//! Poll option domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// Maximum option text length in characters.
pub const MAX_OPTION_TEXT_CHARS: usize = 500;

/// Maximum emoji decoration length in characters.
pub const MAX_EMOJI_CHARS: usize = 16;

/// One selectable answer of a poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub emoji: Option<String>,
    /// Render order, unique within the poll.
    pub display_order: i32,
    /// Cached tally; the vote ledger is the source of truth.
    pub vote_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Option as submitted by a client: plain text or text with an emoji.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionInput {
    Text(String),
    Detailed {
        text: String,
        #[serde(default)]
        emoji: Option<String>,
    },
}

impl OptionInput {
    pub fn text(&self) -> &str {
        match self {
            OptionInput::Text(text) => text,
            OptionInput::Detailed { text, .. } => text,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }
}

/// A validated option ready to be stored alongside its poll.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub emoji: Option<String>,
    pub display_order: i32,
}

impl NewPollOption {
    pub fn from_input(
        input: OptionInput,
        poll_id: Uuid,
        display_order: i32,
    ) -> Result<Self, DomainError> {
        let (text, emoji) = match input {
            OptionInput::Text(text) => (text, None),
            OptionInput::Detailed { text, emoji } => (text, emoji),
        };

        shared::validation::validate_trimmed_chars(&text, 1, MAX_OPTION_TEXT_CHARS, "Option text")
            .map_err(|e| {
                DomainError::Validation(
                    e.message
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Invalid option text".to_string()),
                )
            })?;

        let emoji = shared::validation::normalize_optional(emoji.as_deref());
        if emoji
            .as_ref()
            .is_some_and(|e| e.chars().count() > MAX_EMOJI_CHARS)
        {
            return Err(DomainError::Validation(format!(
                "Option emoji must be at most {} characters",
                MAX_EMOJI_CHARS
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            poll_id,
            text: text.trim().to_string(),
            emoji,
            display_order,
        })
    }

    pub fn to_option(&self, created_at: DateTime<Utc>) -> PollOption {
        PollOption {
            id: self.id,
            poll_id: self.poll_id,
            text: self.text.clone(),
            emoji: self.emoji.clone(),
            display_order: self.display_order,
            vote_count: 0,
            created_at,
        }
    }
}
