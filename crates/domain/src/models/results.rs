//! Tally results with per-option percentages.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::poll::{Poll, PollResponse};
use crate::models::poll_option::PollOption;

/// One option's share of the vote.
#[derive(Debug, Clone, Serialize)]
pub struct OptionResult {
    pub id: Uuid,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    pub display_order: i32,
    pub vote_count: i64,
    /// Percentage of all votes, one decimal place.
    pub percentage: f64,
}

/// Results view of a poll.
#[derive(Debug, Clone, Serialize)]
pub struct PollResults {
    pub poll: PollResponse,
    /// Sum of option counts.
    pub total_votes: i64,
    pub options: Vec<OptionResult>,
}

impl PollResults {
    /// Builds results from a poll and its options (assumed in display order).
    ///
    /// Percentages use the sum of option counts as the denominator since option
    /// counts are updated before the poll's cached total.
    pub fn build(poll: &Poll, options: &[PollOption], now: DateTime<Utc>) -> Self {
        let total: i64 = options.iter().map(|o| o.vote_count).sum();
        let options = options
            .iter()
            .map(|o| OptionResult {
                id: o.id,
                text: o.text.clone(),
                emoji: o.emoji.clone(),
                display_order: o.display_order,
                vote_count: o.vote_count,
                percentage: percentage(o.vote_count, total),
            })
            .collect();

        Self {
            poll: PollResponse::from_poll(poll, now),
            total_votes: total,
            options,
        }
    }
}

/// `count / total * 100` rounded to one decimal; zero when there are no votes.
pub fn percentage(count: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}
