//! Live update events.
//!
//! Events are scoped to a poll and to one document in one of the three
//! collections (polls, options, votes), so consumers can pattern-match on
//! both the kind and the scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::poll::PollStatus;

/// Collection a change event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Polls,
    Options,
    Votes,
}

/// Document a change event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventScope {
    pub collection: Collection,
    pub document_id: Uuid,
}

/// What changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PollEventKind {
    PollUpdated {
        total_votes: i64,
        status: PollStatus,
    },
    OptionUpdated {
        option_id: Uuid,
        vote_count: i64,
    },
    VoteRecorded {
        vote_id: Uuid,
        option_id: Uuid,
        /// Omitted for anonymous polls.
        #[serde(skip_serializing_if = "Option::is_none")]
        voter_id: Option<Uuid>,
    },
}

/// A change notification for one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollEvent {
    pub poll_id: Uuid,
    #[serde(flatten)]
    pub kind: PollEventKind,
    pub emitted_at: DateTime<Utc>,
}

impl PollEvent {
    pub fn poll_updated(poll_id: Uuid, total_votes: i64, status: PollStatus) -> Self {
        Self {
            poll_id,
            kind: PollEventKind::PollUpdated {
                total_votes,
                status,
            },
            emitted_at: Utc::now(),
        }
    }

    pub fn option_updated(poll_id: Uuid, option_id: Uuid, vote_count: i64) -> Self {
        Self {
            poll_id,
            kind: PollEventKind::OptionUpdated {
                option_id,
                vote_count,
            },
            emitted_at: Utc::now(),
        }
    }

    pub fn vote_recorded(
        poll_id: Uuid,
        vote_id: Uuid,
        option_id: Uuid,
        voter_id: Option<Uuid>,
    ) -> Self {
        Self {
            poll_id,
            kind: PollEventKind::VoteRecorded {
                vote_id,
                option_id,
                voter_id,
            },
            emitted_at: Utc::now(),
        }
    }

    pub fn scope(&self) -> EventScope {
        match &self.kind {
            PollEventKind::PollUpdated { .. } => EventScope {
                collection: Collection::Polls,
                document_id: self.poll_id,
            },
            PollEventKind::OptionUpdated { option_id, .. } => EventScope {
                collection: Collection::Options,
                document_id: *option_id,
            },
            PollEventKind::VoteRecorded { vote_id, .. } => EventScope {
                collection: Collection::Votes,
                document_id: *vote_id,
            },
        }
    }

    /// Event name used on the wire (SSE `event:` field).
    pub fn name(&self) -> &'static str {
        match self.kind {
            PollEventKind::PollUpdated { .. } => "poll_updated",
            PollEventKind::OptionUpdated { .. } => "option_updated",
            PollEventKind::VoteRecorded { .. } => "vote_recorded",
        }
    }
}
