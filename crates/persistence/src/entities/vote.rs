//! Vote entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the votes table.
#[derive(Debug, Clone, FromRow)]
pub struct VoteEntity {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub voter_id: Uuid,
    pub cast_at: DateTime<Utc>,
}

impl From<VoteEntity> for domain::models::Vote {
    fn from(entity: VoteEntity) -> Self {
        Self {
            id: entity.id,
            poll_id: entity.poll_id,
            option_id: entity.option_id,
            voter_id: entity.voter_id,
            cast_at: entity.cast_at,
        }
    }
}

/// Ledger count for one option.
#[derive(Debug, Clone, FromRow)]
pub struct OptionCountEntity {
    pub option_id: Uuid,
    pub votes: i64,
}
