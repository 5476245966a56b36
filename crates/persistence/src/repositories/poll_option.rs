//! Poll option repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::PollOptionEntity;
use crate::metrics::QueryTimer;

/// Repository for poll option database operations.
#[derive(Clone)]
pub struct PollOptionRepository {
    pool: PgPool,
}

impl PollOptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Options of a poll in display order.
    pub async fn list_by_poll(&self, poll_id: Uuid) -> Result<Vec<PollOptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_poll_options");
        let result = sqlx::query_as::<_, PollOptionEntity>(
            r#"
            SELECT id, poll_id, text, emoji, display_order, vote_count, created_at
            FROM poll_options
            WHERE poll_id = $1
            ORDER BY display_order ASC
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PollOptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_poll_option_by_id");
        let result = sqlx::query_as::<_, PollOptionEntity>(
            r#"
            SELECT id, poll_id, text, emoji, display_order, vote_count, created_at
            FROM poll_options
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Atomic `vote_count + 1`.
    pub async fn increment_vote_count(
        &self,
        id: Uuid,
    ) -> Result<Option<PollOptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("increment_option_vote_count");
        let result = sqlx::query_as::<_, PollOptionEntity>(
            r#"
            UPDATE poll_options
            SET vote_count = vote_count + 1
            WHERE id = $1
            RETURNING id, poll_id, text, emoji, display_order, vote_count, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Recomputes the cached count from the votes table in one statement.
    pub async fn recount_vote_count(&self, id: Uuid) -> Result<Option<PollOptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("recount_option_vote_count");
        let result = sqlx::query_as::<_, PollOptionEntity>(
            r#"
            UPDATE poll_options
            SET vote_count = (SELECT COUNT(*) FROM votes WHERE votes.option_id = poll_options.id)
            WHERE id = $1
            RETURNING id, poll_id, text, emoji, display_order, vote_count, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }
}
