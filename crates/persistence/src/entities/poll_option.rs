//! Poll option entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the poll_options table.
#[derive(Debug, Clone, FromRow)]
pub struct PollOptionEntity {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub emoji: Option<String>,
    pub display_order: i32,
    pub vote_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<PollOptionEntity> for domain::models::PollOption {
    fn from(entity: PollOptionEntity) -> Self {
        Self {
            id: entity.id,
            poll_id: entity.poll_id,
            text: entity.text,
            emoji: entity.emoji,
            display_order: entity.display_order,
            vote_count: entity.vote_count,
            created_at: entity.created_at,
        }
    }
}
