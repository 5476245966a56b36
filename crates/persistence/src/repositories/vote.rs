//! Vote ledger repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{OptionCountEntity, VoteEntity};
use crate::metrics::QueryTimer;

/// Repository for vote database operations.
#[derive(Clone)]
pub struct VoteRepository {
    pool: PgPool,
}

impl VoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a vote unless the voter already voted in the poll.
    ///
    /// Single statement; returns `None` on the conflict path.
    pub async fn insert_if_absent(
        &self,
        poll_id: Uuid,
        option_id: Uuid,
        voter_id: Uuid,
    ) -> Result<Option<VoteEntity>, sqlx::Error> {
        let timer = QueryTimer::new("insert_vote");
        let result = sqlx::query_as::<_, VoteEntity>(
            r#"
            INSERT INTO votes (poll_id, option_id, voter_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (poll_id, voter_id) DO NOTHING
            RETURNING id, poll_id, option_id, voter_id, cast_at
            "#,
        )
        .bind(poll_id)
        .bind(option_id)
        .bind(voter_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    pub async fn find_by_poll_and_voter(
        &self,
        poll_id: Uuid,
        voter_id: Uuid,
    ) -> Result<Option<VoteEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_vote_by_poll_and_voter");
        let result = sqlx::query_as::<_, VoteEntity>(
            r#"
            SELECT id, poll_id, option_id, voter_id, cast_at
            FROM votes
            WHERE poll_id = $1 AND voter_id = $2
            "#,
        )
        .bind(poll_id)
        .bind(voter_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Number of votes per option of a poll; options without votes are absent.
    pub async fn count_by_option(
        &self,
        poll_id: Uuid,
    ) -> Result<Vec<OptionCountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("count_votes_by_option");
        let result = sqlx::query_as::<_, OptionCountEntity>(
            r#"
            SELECT option_id, COUNT(*) AS votes
            FROM votes
            WHERE poll_id = $1
            GROUP BY option_id
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        result
    }
}
