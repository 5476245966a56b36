//! Poll entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{ChoiceMode, PollStatus, Visibility};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the polls table.
#[derive(Debug, Clone, FromRow)]
pub struct PollEntity {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub choice_mode: String,
    pub anonymous: bool,
    pub visibility: String,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub total_votes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PollEntity> for domain::models::Poll {
    fn from(entity: PollEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            description: entity.description,
            creator_id: entity.creator_id,
            // Only one mode and one visibility exist; the table constrains both
            choice_mode: ChoiceMode::SingleChoice,
            anonymous: entity.anonymous,
            visibility: Visibility::PublicByCode,
            // Unknown stored values never accept votes
            status: entity.status.parse().unwrap_or(PollStatus::Closed),
            expires_at: entity.expires_at,
            total_votes: entity.total_votes,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
