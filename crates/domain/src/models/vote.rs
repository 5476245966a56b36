//! Vote domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable record of one voter's choice in one poll.
///
/// At most one vote exists per `(poll_id, voter_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub voter_id: Uuid,
    pub cast_at: DateTime<Utc>,
}

/// Vote to be inserted by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewVote {
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub voter_id: Uuid,
}

/// Request payload for casting a vote.
#[derive(Debug, Clone, Deserialize)]
pub struct CastVoteRequest {
    pub option_id: Uuid,
}

/// Vote representation returned to the voter who cast it.
#[derive(Debug, Clone, Serialize)]
pub struct VoteResponse {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub cast_at: DateTime<Utc>,
}

impl From<Vote> for VoteResponse {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id,
            poll_id: vote.poll_id,
            option_id: vote.option_id,
            cast_at: vote.cast_at,
        }
    }
}
