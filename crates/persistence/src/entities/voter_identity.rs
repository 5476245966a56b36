//! Voter identity entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the voter_identities table.
#[derive(Debug, Clone, FromRow)]
pub struct VoterIdentityEntity {
    pub id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl From<VoterIdentityEntity> for domain::models::VoterIdentity {
    fn from(entity: VoterIdentityEntity) -> Self {
        Self {
            id: entity.id,
            created_at: entity.created_at,
            last_seen_at: entity.last_seen_at,
        }
    }
}
