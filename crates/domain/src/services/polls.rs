//! Poll service.
//!
//! Orchestrates poll creation, voting, results and closing over the injected
//! stores. The vote ledger insert is the commit point of a vote; tally updates
//! and live events follow it and never fail the vote.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::models::{
    CreatePollRequest, NewPoll, NewVote, Poll, PollEvent, PollOption, PollResults, PollStatus,
    Vote,
};
use crate::services::clock::Clock;
use crate::services::live::{LiveUpdateHub, Subscription};
use crate::services::ports::{IdentityProvider, Stores};
use crate::services::tally::{RetryPolicy, TallyEngine, TallySnapshot};

/// Result of a committed vote.
#[derive(Debug)]
pub struct CastOutcome {
    pub vote: Vote,
    /// Tally update result. An error here means the vote is committed but the
    /// cached counts lag until the next reconciliation.
    pub tally: Result<TallySnapshot, DomainError>,
}

/// Entry point for all poll operations.
#[derive(Clone)]
pub struct PollService {
    stores: Stores,
    tally: TallyEngine,
    hub: LiveUpdateHub,
    clock: Arc<dyn Clock>,
}

impl PollService {
    pub fn new(stores: Stores, hub: LiveUpdateHub, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        let tally = TallyEngine::new(&stores, hub.clone(), clock.clone(), retry);
        Self {
            stores,
            tally,
            hub,
            clock,
        }
    }

    pub fn identities(&self) -> &Arc<dyn IdentityProvider> {
        &self.stores.identities
    }

    pub fn tally(&self) -> &TallyEngine {
        &self.tally
    }

    pub fn hub(&self) -> &LiveUpdateHub {
        &self.hub
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Checks a creation request without storing anything.
    pub fn check_poll_request(&self, request: &CreatePollRequest) -> Result<(), DomainError> {
        NewPoll::from_request(request.clone(), Uuid::nil(), self.clock.now()).map(|_| ())
    }

    /// Validates the request and stores the poll with its options.
    pub async fn create_poll(
        &self,
        request: CreatePollRequest,
        creator_id: Uuid,
    ) -> Result<(Poll, Vec<PollOption>), DomainError> {
        let new_poll = NewPoll::from_request(request, creator_id, self.clock.now())?;
        let (poll, options) = self.stores.polls.create_poll(&new_poll).await?;

        tracing::info!(
            poll_id = %poll.id,
            creator_id = %creator_id,
            options = options.len(),
            expires_at = ?poll.expires_at,
            "Poll created"
        );

        Ok((poll, options))
    }

    pub async fn get_poll(&self, poll_id: Uuid) -> Result<Poll, DomainError> {
        self.stores
            .polls
            .get_poll(poll_id)
            .await?
            .ok_or(DomainError::PollNotFound(poll_id))
    }

    pub async fn list_options(&self, poll_id: Uuid) -> Result<Vec<PollOption>, DomainError> {
        self.get_poll(poll_id).await?;
        self.stores.options.list_options(poll_id).await
    }

    pub async fn results(&self, poll_id: Uuid) -> Result<PollResults, DomainError> {
        let poll = self.get_poll(poll_id).await?;
        let options = self.stores.options.list_options(poll_id).await?;
        Ok(PollResults::build(&poll, &options, self.clock.now()))
    }

    /// Casts one vote for `voter_id`.
    ///
    /// Rejects unknown polls and options, polls that are closed or expired,
    /// and voters who already voted (carrying their existing vote).
    pub async fn cast_vote(
        &self,
        poll_id: Uuid,
        option_id: Uuid,
        voter_id: Uuid,
    ) -> Result<CastOutcome, DomainError> {
        let poll = self.check_vote_target(poll_id, option_id).await?;
        self.record_vote(&poll, option_id, voter_id).await
    }

    /// The poll, if it exists, accepts votes and owns `option_id`.
    pub async fn check_vote_target(&self, poll_id: Uuid, option_id: Uuid) -> Result<Poll, DomainError> {
        let poll = self.get_poll(poll_id).await?;
        if !poll.accepts_votes_at(self.clock.now()) {
            return Err(DomainError::PollClosed(poll_id));
        }

        let belongs = self
            .stores
            .options
            .get_option(option_id)
            .await?
            .is_some_and(|o| o.poll_id == poll_id);
        if !belongs {
            return Err(DomainError::OptionNotFound { poll_id, option_id });
        }

        Ok(poll)
    }

    /// Inserts the vote into the ledger for a poll already checked with
    /// [`Self::check_vote_target`], then updates tallies.
    pub async fn record_vote(
        &self,
        poll: &Poll,
        option_id: Uuid,
        voter_id: Uuid,
    ) -> Result<CastOutcome, DomainError> {
        let poll_id = poll.id;
        let vote = match self
            .stores
            .ledger
            .cast_vote(NewVote {
                poll_id,
                option_id,
                voter_id,
            })
            .await
        {
            Ok(vote) => vote,
            Err(DomainError::AlreadyVoted { existing: None, .. }) => {
                let existing = self
                    .stores
                    .ledger
                    .has_voted(poll_id, voter_id)
                    .await
                    .ok()
                    .flatten()
                    .map(Box::new);
                return Err(DomainError::AlreadyVoted { poll_id, existing });
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            poll_id = %poll_id,
            option_id = %option_id,
            vote_id = %vote.id,
            "Vote committed"
        );

        let visible_voter = (!poll.anonymous).then_some(voter_id);
        self.hub.publish(PollEvent::vote_recorded(
            poll_id,
            vote.id,
            option_id,
            visible_voter,
        ));

        let tally = self.tally.on_vote_cast(&vote).await;
        if let Err(e) = &tally {
            tracing::warn!(
                poll_id = %poll_id,
                vote_id = %vote.id,
                error = %e,
                "Tally update failed after vote commit; left for reconciliation"
            );
        }

        Ok(CastOutcome { vote, tally })
    }

    /// The voter's vote in the poll, if any.
    pub async fn my_vote(&self, poll_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>, DomainError> {
        self.get_poll(poll_id).await?;
        self.stores.ledger.has_voted(poll_id, voter_id).await
    }

    /// Closes the poll. Only its creator may do so; closing twice is a no-op.
    pub async fn close_poll(&self, poll_id: Uuid, requester: Uuid) -> Result<Poll, DomainError> {
        let poll = self.get_poll(poll_id).await?;
        if poll.creator_id != requester {
            return Err(DomainError::Forbidden(
                "Only the poll creator can close it".to_string(),
            ));
        }
        if poll.status == PollStatus::Closed {
            return Ok(poll);
        }

        let closed = self.stores.polls.close_poll(poll_id).await?;
        self.hub.publish(PollEvent::poll_updated(
            poll_id,
            closed.total_votes,
            closed.status_at(self.clock.now()),
        ));
        tracing::info!(poll_id = %poll_id, "Poll closed");

        Ok(closed)
    }

    /// Subscribes to live events of an existing poll.
    pub async fn subscribe(&self, poll_id: Uuid) -> Result<Subscription, DomainError> {
        self.get_poll(poll_id).await?;
        Ok(self.hub.subscribe(poll_id))
    }
}
