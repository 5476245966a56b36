//! Voter identity repository for database operations.

use sqlx::PgPool;

use crate::entities::VoterIdentityEntity;
use crate::metrics::QueryTimer;

/// Repository for voter identity database operations.
#[derive(Clone)]
pub struct VoterIdentityRepository {
    pool: PgPool,
}

impl VoterIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds the identity bound to a token hash and refreshes `last_seen_at`.
    pub async fn touch_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<VoterIdentityEntity>, sqlx::Error> {
        let timer = QueryTimer::new("touch_voter_identity");
        let result = sqlx::query_as::<_, VoterIdentityEntity>(
            r#"
            UPDATE voter_identities
            SET last_seen_at = NOW()
            WHERE token_hash = $1
            RETURNING id, token_hash, created_at, last_seen_at
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Finds the identity bound to a token hash without modifying it.
    pub async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<VoterIdentityEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_voter_identity");
        let result = sqlx::query_as::<_, VoterIdentityEntity>(
            r#"
            SELECT id, token_hash, created_at, last_seen_at
            FROM voter_identities
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    pub async fn create(&self, token_hash: &str) -> Result<VoterIdentityEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_voter_identity");
        let result = sqlx::query_as::<_, VoterIdentityEntity>(
            r#"
            INSERT INTO voter_identities (token_hash)
            VALUES ($1)
            RETURNING id, token_hash, created_at, last_seen_at
            "#,
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }
}
