//! In-memory backend for development and testing.
//!
//! Implements every store port behind a single mutex, so each operation is
//! atomic with respect to the others. Faults can be injected to exercise the
//! retry and reconciliation paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::models::{
    IssuedIdentity, NewPoll, NewVote, Poll, PollOption, PollStatus, Vote, VoterIdentity,
};
use crate::services::ports::{IdentityProvider, OptionStore, PollStore, Stores, VoteLedger};

#[derive(Debug, Default)]
struct MemoryState {
    polls: HashMap<Uuid, Poll>,
    options: HashMap<Uuid, PollOption>,
    /// Keyed by `(poll_id, voter_id)`: the uniqueness constraint.
    votes: HashMap<(Uuid, Uuid), Vote>,
    /// Keyed by SHA-256 hex of the session token.
    identities: HashMap<String, VoterIdentity>,
}

/// In-memory implementation of all store ports.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
    failing_option_increments: AtomicU32,
    failing_poll_increments: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store handles backed by a fresh in-memory store.
    pub fn stores() -> (Stores, Arc<Self>) {
        let store = Self::new();
        (Stores::from_backend(store.clone()), store)
    }

    /// Makes every call fail with [`DomainError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fails the next `n` option count increments.
    pub fn fail_option_increments(&self, n: u32) {
        self.failing_option_increments.store(n, Ordering::SeqCst);
    }

    /// Fails the next `n` poll total increments.
    pub fn fail_poll_increments(&self, n: u32) {
        self.failing_poll_increments.store(n, Ordering::SeqCst);
    }

    /// Number of committed votes across all polls.
    pub fn vote_count(&self) -> usize {
        self.state.lock().map(|s| s.votes.len()).unwrap_or(0)
    }

    /// Number of issued voter identities.
    pub fn identity_count(&self) -> usize {
        self.state.lock().map(|s| s.identities.len()).unwrap_or(0)
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::Unavailable(
                "in-memory store is unavailable".to_string(),
            ));
        }
        self.state
            .lock()
            .map_err(|_| DomainError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn take_fault(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl MemoryState {
    fn ledger_counts(&self, poll_id: Uuid) -> HashMap<Uuid, i64> {
        let mut counts = HashMap::new();
        for vote in self.votes.values().filter(|v| v.poll_id == poll_id) {
            *counts.entry(vote.option_id).or_insert(0) += 1;
        }
        counts
    }

    fn is_drifted(&self, poll: &Poll) -> bool {
        let counts = self.ledger_counts(poll.id);
        let total: i64 = counts.values().sum();
        if poll.total_votes != total {
            return true;
        }
        self.options
            .values()
            .filter(|o| o.poll_id == poll.id)
            .any(|o| o.vote_count != counts.get(&o.id).copied().unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl PollStore for InMemoryStore {
    async fn create_poll(&self, new_poll: &NewPoll) -> Result<(Poll, Vec<PollOption>), DomainError> {
        let mut state = self.state()?;
        if state.polls.contains_key(&new_poll.id) {
            return Err(DomainError::Unavailable(format!(
                "poll id collision: {}",
                new_poll.id
            )));
        }

        let poll = new_poll.to_poll();
        let options: Vec<PollOption> = new_poll
            .options
            .iter()
            .map(|o| o.to_option(new_poll.created_at))
            .collect();

        state.polls.insert(poll.id, poll.clone());
        for option in &options {
            state.options.insert(option.id, option.clone());
        }
        Ok((poll, options))
    }

    async fn get_poll(&self, poll_id: Uuid) -> Result<Option<Poll>, DomainError> {
        Ok(self.state()?.polls.get(&poll_id).cloned())
    }

    async fn increment_total_votes(&self, poll_id: Uuid) -> Result<Poll, DomainError> {
        if Self::take_fault(&self.failing_poll_increments) {
            return Err(DomainError::Unavailable(
                "injected poll increment failure".to_string(),
            ));
        }
        let mut state = self.state()?;
        let poll = state
            .polls
            .get_mut(&poll_id)
            .ok_or(DomainError::PollNotFound(poll_id))?;
        poll.total_votes += 1;
        poll.updated_at = Utc::now();
        Ok(poll.clone())
    }

    async fn recount_total_votes(&self, poll_id: Uuid) -> Result<Poll, DomainError> {
        let mut state = self.state()?;
        let total = state.votes.values().filter(|v| v.poll_id == poll_id).count() as i64;
        let poll = state
            .polls
            .get_mut(&poll_id)
            .ok_or(DomainError::PollNotFound(poll_id))?;
        poll.total_votes = total;
        poll.updated_at = Utc::now();
        Ok(poll.clone())
    }

    async fn close_poll(&self, poll_id: Uuid) -> Result<Poll, DomainError> {
        let mut state = self.state()?;
        let poll = state
            .polls
            .get_mut(&poll_id)
            .ok_or(DomainError::PollNotFound(poll_id))?;
        if poll.status != PollStatus::Closed {
            poll.status = PollStatus::Closed;
            poll.updated_at = Utc::now();
        }
        Ok(poll.clone())
    }

    async fn drifted_poll_ids(&self, limit: i64) -> Result<Vec<Uuid>, DomainError> {
        let state = self.state()?;
        let mut drifted: Vec<&Poll> = state.polls.values().filter(|p| state.is_drifted(p)).collect();
        drifted.sort_by_key(|p| p.created_at);
        Ok(drifted
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|p| p.id)
            .collect())
    }
}

#[async_trait::async_trait]
impl OptionStore for InMemoryStore {
    async fn list_options(&self, poll_id: Uuid) -> Result<Vec<PollOption>, DomainError> {
        let state = self.state()?;
        let mut options: Vec<PollOption> = state
            .options
            .values()
            .filter(|o| o.poll_id == poll_id)
            .cloned()
            .collect();
        options.sort_by_key(|o| o.display_order);
        Ok(options)
    }

    async fn get_option(&self, option_id: Uuid) -> Result<Option<PollOption>, DomainError> {
        Ok(self.state()?.options.get(&option_id).cloned())
    }

    async fn increment_vote_count(&self, option_id: Uuid) -> Result<PollOption, DomainError> {
        if Self::take_fault(&self.failing_option_increments) {
            return Err(DomainError::Unavailable(
                "injected option increment failure".to_string(),
            ));
        }
        let mut state = self.state()?;
        let option = state.options.get_mut(&option_id).ok_or_else(|| {
            DomainError::Unavailable(format!("option {} disappeared", option_id))
        })?;
        option.vote_count += 1;
        Ok(option.clone())
    }

    async fn recount_vote_count(&self, option_id: Uuid) -> Result<PollOption, DomainError> {
        let mut state = self.state()?;
        let count = state
            .votes
            .values()
            .filter(|v| v.option_id == option_id)
            .count() as i64;
        let option = state.options.get_mut(&option_id).ok_or_else(|| {
            DomainError::Unavailable(format!("option {} disappeared", option_id))
        })?;
        option.vote_count = count;
        Ok(option.clone())
    }
}

#[async_trait::async_trait]
impl VoteLedger for InMemoryStore {
    async fn has_voted(&self, poll_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>, DomainError> {
        Ok(self.state()?.votes.get(&(poll_id, voter_id)).cloned())
    }

    async fn cast_vote(&self, vote: NewVote) -> Result<Vote, DomainError> {
        let mut state = self.state()?;
        let key = (vote.poll_id, vote.voter_id);
        if let Some(existing) = state.votes.get(&key) {
            return Err(DomainError::AlreadyVoted {
                poll_id: vote.poll_id,
                existing: Some(Box::new(existing.clone())),
            });
        }

        let committed = Vote {
            id: Uuid::new_v4(),
            poll_id: vote.poll_id,
            option_id: vote.option_id,
            voter_id: vote.voter_id,
            cast_at: Utc::now(),
        };
        state.votes.insert(key, committed.clone());
        Ok(committed)
    }

    async fn count_by_option(&self, poll_id: Uuid) -> Result<Vec<(Uuid, i64)>, DomainError> {
        Ok(self.state()?.ledger_counts(poll_id).into_iter().collect())
    }
}

#[async_trait::async_trait]
impl IdentityProvider for InMemoryStore {
    async fn get_or_create_identity(
        &self,
        session_token: Option<&str>,
    ) -> Result<IssuedIdentity, DomainError> {
        let mut state = self.state()?;

        if let Some(token) = session_token.filter(|t| shared::crypto::is_well_formed_voter_token(t))
        {
            let hash = shared::crypto::sha256_hex(token);
            if let Some(identity) = state.identities.get_mut(&hash) {
                identity.last_seen_at = Utc::now();
                return Ok(IssuedIdentity {
                    identity: identity.clone(),
                    session_token: token.to_string(),
                    created: false,
                });
            }
        }

        let token = shared::crypto::generate_voter_token();
        let now = Utc::now();
        let identity = VoterIdentity {
            id: Uuid::new_v4(),
            created_at: now,
            last_seen_at: now,
        };
        state
            .identities
            .insert(shared::crypto::sha256_hex(&token), identity.clone());

        Ok(IssuedIdentity {
            identity,
            session_token: token,
            created: true,
        })
    }

    async fn resolve(&self, session_token: &str) -> Result<Option<VoterIdentity>, DomainError> {
        if !shared::crypto::is_well_formed_voter_token(session_token) {
            return Ok(None);
        }
        let hash = shared::crypto::sha256_hex(session_token);
        Ok(self.state()?.identities.get(&hash).cloned())
    }
}
