//! Store ports.
//!
//! The poll service only talks to storage through these traits, so the same
//! logic runs against PostgreSQL in production and the in-memory backend in
//! tests. Implementations must provide the atomicity documented on each method.

use std::sync::Arc;

use uuid::Uuid;

use crate::errors::DomainError;
use crate::models::{
    IssuedIdentity, NewPoll, NewVote, Poll, PollOption, Vote, VoterIdentity,
};

/// Poll metadata and lifecycle.
#[async_trait::async_trait]
pub trait PollStore: Send + Sync {
    /// Stores the poll and all of its options as one unit.
    async fn create_poll(&self, new_poll: &NewPoll) -> Result<(Poll, Vec<PollOption>), DomainError>;

    async fn get_poll(&self, poll_id: Uuid) -> Result<Option<Poll>, DomainError>;

    /// Atomic server-side `total_votes + 1`.
    async fn increment_total_votes(&self, poll_id: Uuid) -> Result<Poll, DomainError>;

    /// Sets the cached total to the ledger's vote count in one atomic step.
    /// Reconciliation only.
    async fn recount_total_votes(&self, poll_id: Uuid) -> Result<Poll, DomainError>;

    /// Sets the stored status to closed. Idempotent.
    async fn close_poll(&self, poll_id: Uuid) -> Result<Poll, DomainError>;

    /// Polls whose cached counts disagree with the vote ledger.
    async fn drifted_poll_ids(&self, limit: i64) -> Result<Vec<Uuid>, DomainError>;
}

/// Poll options and their cached tallies.
#[async_trait::async_trait]
pub trait OptionStore: Send + Sync {
    /// Options of a poll ordered by `display_order` ascending.
    async fn list_options(&self, poll_id: Uuid) -> Result<Vec<PollOption>, DomainError>;

    async fn get_option(&self, option_id: Uuid) -> Result<Option<PollOption>, DomainError>;

    /// Atomic server-side `vote_count + 1`.
    async fn increment_vote_count(&self, option_id: Uuid) -> Result<PollOption, DomainError>;

    /// Sets the cached count to the ledger's vote count in one atomic step.
    /// Reconciliation only.
    async fn recount_vote_count(&self, option_id: Uuid) -> Result<PollOption, DomainError>;
}

/// Append-only record of votes, unique per `(poll_id, voter_id)`.
#[async_trait::async_trait]
pub trait VoteLedger: Send + Sync {
    async fn has_voted(&self, poll_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>, DomainError>;

    /// Inserts the vote iff the voter has no vote in the poll yet.
    ///
    /// Must be a single conditional operation in the store; the conflict path
    /// returns [`DomainError::AlreadyVoted`].
    async fn cast_vote(&self, vote: NewVote) -> Result<Vote, DomainError>;

    /// Ledger truth: number of votes per option of a poll. Options without
    /// votes may be absent.
    async fn count_by_option(&self, poll_id: Uuid) -> Result<Vec<(Uuid, i64)>, DomainError>;
}

/// Anonymous voter identities bound to session tokens.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the identity bound to `session_token`, or issues a new one when
    /// the token is absent or unknown. Idempotent for a known token.
    async fn get_or_create_identity(
        &self,
        session_token: Option<&str>,
    ) -> Result<IssuedIdentity, DomainError>;

    /// Looks up an identity without creating one.
    async fn resolve(&self, session_token: &str) -> Result<Option<VoterIdentity>, DomainError>;
}

/// The set of store handles a service is built from.
#[derive(Clone)]
pub struct Stores {
    pub polls: Arc<dyn PollStore>,
    pub options: Arc<dyn OptionStore>,
    pub ledger: Arc<dyn VoteLedger>,
    pub identities: Arc<dyn IdentityProvider>,
}

impl Stores {
    /// All four ports served by one backend value.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: PollStore + OptionStore + VoteLedger + IdentityProvider + 'static,
    {
        Self {
            polls: backend.clone(),
            options: backend.clone(),
            ledger: backend.clone(),
            identities: backend,
        }
    }
}
