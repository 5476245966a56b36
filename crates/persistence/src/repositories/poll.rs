//! Poll repository for database operations.

use domain::models::NewPoll;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{PollEntity, PollOptionEntity};
use crate::metrics::QueryTimer;

const POLL_COLUMNS: &str = "id, title, description, creator_id, choice_mode, anonymous, \
                            visibility, status, expires_at, total_votes, created_at, updated_at";

/// Repository for poll database operations.
#[derive(Clone)]
pub struct PollRepository {
    pool: PgPool,
}

impl PollRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a poll and all of its options in one transaction.
    pub async fn create_with_options(
        &self,
        new_poll: &NewPoll,
    ) -> Result<(PollEntity, Vec<PollOptionEntity>), sqlx::Error> {
        let timer = QueryTimer::new("create_poll_with_options");
        let mut tx = self.pool.begin().await?;

        let poll = sqlx::query_as::<_, PollEntity>(&format!(
            r#"
            INSERT INTO polls (id, title, description, creator_id, anonymous, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {POLL_COLUMNS}
            "#
        ))
        .bind(new_poll.id)
        .bind(&new_poll.title)
        .bind(&new_poll.description)
        .bind(new_poll.creator_id)
        .bind(new_poll.anonymous)
        .bind(new_poll.expires_at)
        .bind(new_poll.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let mut options = Vec::with_capacity(new_poll.options.len());
        for option in &new_poll.options {
            let entity = sqlx::query_as::<_, PollOptionEntity>(
                r#"
                INSERT INTO poll_options (id, poll_id, text, emoji, display_order, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, poll_id, text, emoji, display_order, vote_count, created_at
                "#,
            )
            .bind(option.id)
            .bind(option.poll_id)
            .bind(&option.text)
            .bind(&option.emoji)
            .bind(option.display_order)
            .bind(new_poll.created_at)
            .fetch_one(&mut *tx)
            .await?;
            options.push(entity);
        }

        tx.commit().await?;
        timer.record();
        Ok((poll, options))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PollEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_poll_by_id");
        let result = sqlx::query_as::<_, PollEntity>(&format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Atomic `total_votes + 1`.
    pub async fn increment_total_votes(&self, id: Uuid) -> Result<Option<PollEntity>, sqlx::Error> {
        let timer = QueryTimer::new("increment_poll_total_votes");
        let result = sqlx::query_as::<_, PollEntity>(&format!(
            r#"
            UPDATE polls
            SET total_votes = total_votes + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING {POLL_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Recomputes the cached total from the votes table in one statement.
    pub async fn recount_total_votes(&self, id: Uuid) -> Result<Option<PollEntity>, sqlx::Error> {
        let timer = QueryTimer::new("recount_poll_total_votes");
        let result = sqlx::query_as::<_, PollEntity>(&format!(
            r#"
            UPDATE polls
            SET total_votes = (SELECT COUNT(*) FROM votes WHERE votes.poll_id = polls.id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POLL_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Marks the poll closed. A poll that is already closed is returned unchanged.
    pub async fn close(&self, id: Uuid) -> Result<Option<PollEntity>, sqlx::Error> {
        let timer = QueryTimer::new("close_poll");
        let result = sqlx::query_as::<_, PollEntity>(&format!(
            r#"
            UPDATE polls
            SET status = 'closed',
                updated_at = CASE WHEN status = 'closed' THEN updated_at ELSE NOW() END
            WHERE id = $1
            RETURNING {POLL_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Ids of polls whose cached total or any option count disagrees with the votes table.
    pub async fn find_drifted_ids(&self, limit: i64) -> Result<Vec<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("find_drifted_poll_ids");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT p.id
            FROM polls p
            WHERE p.total_votes <> (SELECT COUNT(*) FROM votes v WHERE v.poll_id = p.id)
               OR EXISTS (
                    SELECT 1
                    FROM poll_options o
                    WHERE o.poll_id = p.id
                      AND o.vote_count <> (SELECT COUNT(*) FROM votes v WHERE v.option_id = o.id)
               )
            ORDER BY p.created_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        result
    }
}
