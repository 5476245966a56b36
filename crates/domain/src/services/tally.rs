//! Tally engine.
//!
//! Keeps the cached option counts and poll totals in step with the vote
//! ledger. Increments run after a vote is committed and are retried on
//! transient failures; anything that still slips through is repaired by
//! [`TallyEngine::reconcile`], which rewrites cached counts from the ledger.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::models::{PollEvent, Vote};
use crate::services::clock::Clock;
use crate::services::live::LiveUpdateHub;
use crate::services::ports::{OptionStore, PollStore, Stores, VoteLedger};

/// Retry policy for counter updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Delay before the second attempt; doubled after each further failure.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Cached counts right after a vote was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TallySnapshot {
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub option_vote_count: i64,
    pub total_votes: i64,
}

/// Outcome of reconciling one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub poll_id: Uuid,
    pub options_corrected: usize,
    pub total_before: i64,
    pub total_after: i64,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.options_corrected > 0 || self.total_before != self.total_after
    }
}

/// Applies committed votes to cached tallies and repairs drift.
#[derive(Clone)]
pub struct TallyEngine {
    polls: Arc<dyn PollStore>,
    options: Arc<dyn OptionStore>,
    ledger: Arc<dyn VoteLedger>,
    hub: LiveUpdateHub,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl TallyEngine {
    pub fn new(stores: &Stores, hub: LiveUpdateHub, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            polls: stores.polls.clone(),
            options: stores.options.clone(),
            ledger: stores.ledger.clone(),
            hub,
            clock,
            retry,
        }
    }

    /// Applies one committed vote: option count first, then the poll total.
    ///
    /// Each increment is retried independently. If the poll total still fails
    /// the option count stays applied and the gap is left to reconciliation.
    pub async fn on_vote_cast(&self, vote: &Vote) -> Result<TallySnapshot, DomainError> {
        let option = self
            .with_retry("increment_vote_count", || {
                self.options.increment_vote_count(vote.option_id)
            })
            .await?;
        self.hub.publish(PollEvent::option_updated(
            vote.poll_id,
            option.id,
            option.vote_count,
        ));

        let poll = self
            .with_retry("increment_total_votes", || {
                self.polls.increment_total_votes(vote.poll_id)
            })
            .await?;
        self.hub.publish(PollEvent::poll_updated(
            poll.id,
            poll.total_votes,
            poll.status_at(self.clock.now()),
        ));

        Ok(TallySnapshot {
            poll_id: poll.id,
            option_id: option.id,
            option_vote_count: option.vote_count,
            total_votes: poll.total_votes,
        })
    }

    /// Rewrites cached counts of one poll from the vote ledger.
    ///
    /// The ledger snapshot only selects what to fix; each fix is an atomic
    /// recount in the store, so votes committed meanwhile are not lost.
    /// Every corrected document is published so live viewers converge too.
    pub async fn reconcile(&self, poll_id: Uuid) -> Result<ReconcileReport, DomainError> {
        let poll = self
            .polls
            .get_poll(poll_id)
            .await?
            .ok_or(DomainError::PollNotFound(poll_id))?;

        let truth: HashMap<Uuid, i64> = self.ledger.count_by_option(poll_id).await?.into_iter().collect();
        let options = self.options.list_options(poll_id).await?;

        let mut options_corrected = 0;
        for option in options {
            let expected = truth.get(&option.id).copied().unwrap_or(0);
            if option.vote_count == expected {
                continue;
            }
            let updated = self.options.recount_vote_count(option.id).await?;
            tracing::info!(
                poll_id = %poll_id,
                option_id = %option.id,
                cached = option.vote_count,
                ledger = updated.vote_count,
                "Corrected option vote count"
            );
            self.hub.publish(PollEvent::option_updated(
                poll_id,
                updated.id,
                updated.vote_count,
            ));
            options_corrected += 1;
        }

        let expected_total: i64 = truth.values().sum();
        let total_before = poll.total_votes;
        let mut total_after = total_before;
        if total_before != expected_total {
            let updated = self.polls.recount_total_votes(poll_id).await?;
            tracing::info!(
                poll_id = %poll_id,
                cached = total_before,
                ledger = updated.total_votes,
                "Corrected poll total"
            );
            total_after = updated.total_votes;
            self.hub.publish(PollEvent::poll_updated(
                poll_id,
                updated.total_votes,
                updated.status_at(self.clock.now()),
            ));
        }

        Ok(ReconcileReport {
            poll_id,
            options_corrected,
            total_before,
            total_after,
        })
    }

    /// Reconciles up to `limit` polls whose cached counts disagree with the ledger.
    ///
    /// A failure on one poll is logged and does not stop the batch.
    pub async fn reconcile_drifted(&self, limit: i64) -> Result<Vec<ReconcileReport>, DomainError> {
        let poll_ids = self.polls.drifted_poll_ids(limit).await?;
        let mut reports = Vec::with_capacity(poll_ids.len());

        for poll_id in poll_ids {
            match self.reconcile(poll_id).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::warn!(poll_id = %poll_id, error = %e, "Failed to reconcile poll");
                }
            }
        }

        Ok(reports)
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut f: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Tally update failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
