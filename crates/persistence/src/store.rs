//! PostgreSQL implementation of the domain store ports.

use domain::errors::DomainError;
use domain::models::{IssuedIdentity, NewPoll, NewVote, Poll, PollOption, Vote, VoterIdentity};
use domain::services::{IdentityProvider, OptionStore, PollStore, VoteLedger};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repositories::{
    PollOptionRepository, PollRepository, VoteRepository, VoterIdentityRepository,
};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Maps any database failure to a transient backend error.
fn unavailable(e: sqlx::Error) -> DomainError {
    tracing::error!(error = %e, "Database error");
    DomainError::Unavailable(e.to_string())
}

fn db_error_code(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.code().map(|c| c.to_string()),
        _ => None,
    }
}

/// Store backed by PostgreSQL via sqlx.
#[derive(Clone)]
pub struct PgStore {
    polls: PollRepository,
    options: PollOptionRepository,
    votes: VoteRepository,
    identities: VoterIdentityRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            polls: PollRepository::new(pool.clone()),
            options: PollOptionRepository::new(pool.clone()),
            votes: VoteRepository::new(pool.clone()),
            identities: VoterIdentityRepository::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        self.polls.pool()
    }

    async fn existing_vote(&self, poll_id: Uuid, voter_id: Uuid) -> Option<Box<Vote>> {
        self.votes
            .find_by_poll_and_voter(poll_id, voter_id)
            .await
            .ok()
            .flatten()
            .map(|e| Box::new(e.into()))
    }
}

#[async_trait::async_trait]
impl PollStore for PgStore {
    async fn create_poll(&self, new_poll: &NewPoll) -> Result<(Poll, Vec<PollOption>), DomainError> {
        let (poll, options) = self
            .polls
            .create_with_options(new_poll)
            .await
            .map_err(|e| match db_error_code(&e).as_deref() {
                Some(FOREIGN_KEY_VIOLATION) => DomainError::Validation(format!(
                    "Unknown creator identity: {}",
                    new_poll.creator_id
                )),
                _ => unavailable(e),
            })?;
        Ok((poll.into(), options.into_iter().map(Into::into).collect()))
    }

    async fn get_poll(&self, poll_id: Uuid) -> Result<Option<Poll>, DomainError> {
        self.polls
            .find_by_id(poll_id)
            .await
            .map(|p| p.map(Into::into))
            .map_err(unavailable)
    }

    async fn increment_total_votes(&self, poll_id: Uuid) -> Result<Poll, DomainError> {
        self.polls
            .increment_total_votes(poll_id)
            .await
            .map_err(unavailable)?
            .map(Into::into)
            .ok_or(DomainError::PollNotFound(poll_id))
    }

    async fn recount_total_votes(&self, poll_id: Uuid) -> Result<Poll, DomainError> {
        self.polls
            .recount_total_votes(poll_id)
            .await
            .map_err(unavailable)?
            .map(Into::into)
            .ok_or(DomainError::PollNotFound(poll_id))
    }

    async fn close_poll(&self, poll_id: Uuid) -> Result<Poll, DomainError> {
        self.polls
            .close(poll_id)
            .await
            .map_err(unavailable)?
            .map(Into::into)
            .ok_or(DomainError::PollNotFound(poll_id))
    }

    async fn drifted_poll_ids(&self, limit: i64) -> Result<Vec<Uuid>, DomainError> {
        self.polls.find_drifted_ids(limit).await.map_err(unavailable)
    }
}

#[async_trait::async_trait]
impl OptionStore for PgStore {
    async fn list_options(&self, poll_id: Uuid) -> Result<Vec<PollOption>, DomainError> {
        self.options
            .list_by_poll(poll_id)
            .await
            .map(|options| options.into_iter().map(Into::into).collect())
            .map_err(unavailable)
    }

    async fn get_option(&self, option_id: Uuid) -> Result<Option<PollOption>, DomainError> {
        self.options
            .find_by_id(option_id)
            .await
            .map(|o| o.map(Into::into))
            .map_err(unavailable)
    }

    async fn increment_vote_count(&self, option_id: Uuid) -> Result<PollOption, DomainError> {
        self.options
            .increment_vote_count(option_id)
            .await
            .map_err(unavailable)?
            .map(Into::into)
            .ok_or_else(|| DomainError::Unavailable(format!("option {} disappeared", option_id)))
    }

    async fn recount_vote_count(&self, option_id: Uuid) -> Result<PollOption, DomainError> {
        self.options
            .recount_vote_count(option_id)
            .await
            .map_err(unavailable)?
            .map(Into::into)
            .ok_or_else(|| DomainError::Unavailable(format!("option {} disappeared", option_id)))
    }
}

#[async_trait::async_trait]
impl VoteLedger for PgStore {
    async fn has_voted(&self, poll_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>, DomainError> {
        self.votes
            .find_by_poll_and_voter(poll_id, voter_id)
            .await
            .map(|v| v.map(Into::into))
            .map_err(unavailable)
    }

    async fn cast_vote(&self, vote: NewVote) -> Result<Vote, DomainError> {
        match self
            .votes
            .insert_if_absent(vote.poll_id, vote.option_id, vote.voter_id)
            .await
        {
            Ok(Some(entity)) => Ok(entity.into()),
            Ok(None) => Err(DomainError::AlreadyVoted {
                poll_id: vote.poll_id,
                existing: self.existing_vote(vote.poll_id, vote.voter_id).await,
            }),
            Err(e) => match db_error_code(&e).as_deref() {
                Some(UNIQUE_VIOLATION) => Err(DomainError::AlreadyVoted {
                    poll_id: vote.poll_id,
                    existing: self.existing_vote(vote.poll_id, vote.voter_id).await,
                }),
                Some(FOREIGN_KEY_VIOLATION) => Err(DomainError::OptionNotFound {
                    poll_id: vote.poll_id,
                    option_id: vote.option_id,
                }),
                _ => Err(unavailable(e)),
            },
        }
    }

    async fn count_by_option(&self, poll_id: Uuid) -> Result<Vec<(Uuid, i64)>, DomainError> {
        self.votes
            .count_by_option(poll_id)
            .await
            .map(|rows| rows.into_iter().map(|r| (r.option_id, r.votes)).collect())
            .map_err(unavailable)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for PgStore {
    async fn get_or_create_identity(
        &self,
        session_token: Option<&str>,
    ) -> Result<IssuedIdentity, DomainError> {
        if let Some(token) = session_token.filter(|t| shared::crypto::is_well_formed_voter_token(t))
        {
            let hash = shared::crypto::sha256_hex(token);
            if let Some(entity) = self
                .identities
                .touch_by_token_hash(&hash)
                .await
                .map_err(unavailable)?
            {
                return Ok(IssuedIdentity {
                    identity: entity.into(),
                    session_token: token.to_string(),
                    created: false,
                });
            }
        }

        let token = shared::crypto::generate_voter_token();
        let entity = self
            .identities
            .create(&shared::crypto::sha256_hex(&token))
            .await
            .map_err(unavailable)?;

        tracing::debug!(voter_id = %entity.id, "Issued voter identity");

        Ok(IssuedIdentity {
            identity: entity.into(),
            session_token: token,
            created: true,
        })
    }

    async fn resolve(&self, session_token: &str) -> Result<Option<VoterIdentity>, DomainError> {
        if !shared::crypto::is_well_formed_voter_token(session_token) {
            return Ok(None);
        }
        self.identities
            .find_by_token_hash(&shared::crypto::sha256_hex(session_token))
            .await
            .map(|e| e.map(Into::into))
            .map_err(unavailable)
    }
}
