//! Client-side view of a live poll.
//!
//! `PollView` is the state a viewer keeps while watching a poll: the last
//! known counts, its connection state, and an optional optimistic prediction
//! for its own vote. Authoritative events always win over the prediction.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::models::{
    OptionResult, Poll, PollEventKind, PollOption, PollStatus, Vote,
};
use crate::models::results::percentage;
use crate::services::live::SubscriptionItem;

/// Connection state of a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Connecting,
    Subscribed,
    Receiving,
    Disconnected,
}

impl ViewerState {
    fn can_transition_to(self, to: ViewerState) -> bool {
        use ViewerState::*;
        matches!(
            (self, to),
            (Connecting, Subscribed)
                | (Subscribed, Receiving)
                | (Receiving, Receiving)
                | (Disconnected, Connecting)
                | (Connecting | Subscribed | Receiving | Disconnected, Disconnected)
        )
    }
}

/// Errors from driving a [`PollView`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("Invalid viewer transition from {from:?} to {to:?}")]
    InvalidTransition { from: ViewerState, to: ViewerState },

    #[error("A vote is already in flight")]
    VoteInFlight,

    #[error("Already voted in this poll")]
    AlreadyVoted,

    #[error("Option {0} is not part of this poll")]
    UnknownOption(Uuid),

    #[error("Poll is not accepting votes")]
    PollClosed,
}

#[derive(Debug, Clone, PartialEq)]
struct ViewOption {
    id: Uuid,
    text: String,
    emoji: Option<String>,
    display_order: i32,
    vote_count: i64,
}

/// Local, last-known state of one poll as seen by one viewer.
#[derive(Debug, Clone)]
pub struct PollView {
    poll_id: Uuid,
    state: ViewerState,
    status: PollStatus,
    total_votes: i64,
    options: Vec<ViewOption>,
    my_vote: Option<Uuid>,
    vote_in_flight: bool,
    predicted: Option<Uuid>,
    needs_refetch: bool,
}

impl PollView {
    pub fn new(poll_id: Uuid) -> Self {
        Self {
            poll_id,
            state: ViewerState::Connecting,
            status: PollStatus::Active,
            total_votes: 0,
            options: Vec::new(),
            my_vote: None,
            vote_in_flight: false,
            predicted: None,
            needs_refetch: true,
        }
    }

    pub fn poll_id(&self) -> Uuid {
        self.poll_id
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn status(&self) -> PollStatus {
        self.status
    }

    pub fn total_votes(&self) -> i64 {
        self.total_votes
    }

    pub fn my_vote(&self) -> Option<Uuid> {
        self.my_vote
    }

    pub fn vote_in_flight(&self) -> bool {
        self.vote_in_flight
    }

    /// True after a gap or reconnect, until [`PollView::reconcile`] runs.
    pub fn needs_refetch(&self) -> bool {
        self.needs_refetch
    }

    fn transition(&mut self, to: ViewerState) -> Result<(), ViewError> {
        if !self.state.can_transition_to(to) {
            return Err(ViewError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn subscribed(&mut self) -> Result<(), ViewError> {
        self.transition(ViewerState::Subscribed)
    }

    /// Keeps the last known state.
    pub fn disconnect(&mut self) {
        self.state = ViewerState::Disconnected;
    }

    /// Starts over; events may have been missed while disconnected.
    pub fn reconnect(&mut self) -> Result<(), ViewError> {
        self.transition(ViewerState::Connecting)?;
        self.needs_refetch = true;
        Ok(())
    }

    /// Replaces local state with a full refetch of the poll and its options.
    pub fn reconcile(&mut self, poll: &Poll, options: &[PollOption], now: DateTime<Utc>) {
        self.status = poll.status_at(now);
        self.total_votes = poll.total_votes;
        self.options = options
            .iter()
            .map(|o| ViewOption {
                id: o.id,
                text: o.text.clone(),
                emoji: o.emoji.clone(),
                display_order: o.display_order,
                vote_count: o.vote_count,
            })
            .collect();
        self.options.sort_by_key(|o| o.display_order);
        self.predicted = None;
        self.needs_refetch = false;
    }

    /// Merges one item from the live subscription.
    pub fn apply(&mut self, item: &SubscriptionItem) -> Result<(), ViewError> {
        self.transition(ViewerState::Receiving)?;

        let event = match item {
            SubscriptionItem::Gap(_) => {
                self.needs_refetch = true;
                return Ok(());
            }
            SubscriptionItem::Event(event) => event,
        };
        if event.poll_id != self.poll_id {
            return Ok(());
        }

        match &event.kind {
            PollEventKind::OptionUpdated {
                option_id,
                vote_count,
            } => {
                if let Some(option) = self.options.iter_mut().find(|o| o.id == *option_id) {
                    option.vote_count = *vote_count;
                }
                self.predicted = None;
            }
            PollEventKind::PollUpdated {
                total_votes,
                status,
            } => {
                self.total_votes = *total_votes;
                self.status = *status;
                self.predicted = None;
            }
            PollEventKind::VoteRecorded { .. } => {}
        }
        Ok(())
    }

    /// Marks a vote as in flight and records the optimistic prediction.
    pub fn predict_vote(&mut self, option_id: Uuid) -> Result<(), ViewError> {
        if self.vote_in_flight {
            return Err(ViewError::VoteInFlight);
        }
        if self.my_vote.is_some() {
            return Err(ViewError::AlreadyVoted);
        }
        if self.status != PollStatus::Active {
            return Err(ViewError::PollClosed);
        }
        if !self.options.iter().any(|o| o.id == option_id) {
            return Err(ViewError::UnknownOption(option_id));
        }

        self.vote_in_flight = true;
        self.predicted = Some(option_id);
        Ok(())
    }

    /// The prediction stays until an authoritative event overwrites it.
    pub fn vote_succeeded(&mut self, vote: &Vote) {
        self.vote_in_flight = false;
        self.my_vote = Some(vote.option_id);
    }

    pub fn vote_failed(&mut self, error: &DomainError) {
        self.vote_in_flight = false;
        self.predicted = None;
        match error {
            DomainError::AlreadyVoted {
                existing: Some(existing),
                ..
            } => self.my_vote = Some(existing.option_id),
            DomainError::PollClosed(_) => self.status = PollStatus::Closed,
            _ => {}
        }
    }

    /// Counts to render, including the pending prediction if any.
    pub fn display_total(&self) -> i64 {
        self.total_votes + i64::from(self.predicted.is_some())
    }

    /// Options to render with counts and percentages, prediction included.
    pub fn display_options(&self) -> Vec<OptionResult> {
        let counts: Vec<i64> = self
            .options
            .iter()
            .map(|o| o.vote_count + i64::from(self.predicted == Some(o.id)))
            .collect();
        let total: i64 = counts.iter().sum();

        self.options
            .iter()
            .zip(counts)
            .map(|(o, count)| OptionResult {
                id: o.id,
                text: o.text.clone(),
                emoji: o.emoji.clone(),
                display_order: o.display_order,
                vote_count: count,
                percentage: percentage(count, total),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreatePollRequest, NewPoll, OptionInput, PollEvent};

    fn snapshot() -> (Poll, Vec<PollOption>) {
        let now = Utc::now();
        let new_poll = NewPoll::from_request(
            CreatePollRequest {
                title: "Pizza or Tacos?".into(),
                description: None,
                options: vec![OptionInput::Text("Pizza".into()), OptionInput::Text("Tacos".into())],
                anonymous: true,
                ttl_hours: 1,
            },
            Uuid::new_v4(),
            now,
        )
        .unwrap();
        let options = new_poll.options.iter().map(|o| o.to_option(now)).collect();
        (new_poll.to_poll(), options)
    }

    fn live_view() -> (PollView, Poll, Vec<PollOption>) {
        let (poll, options) = snapshot();
        let mut view = PollView::new(poll.id);
        view.reconcile(&poll, &options, Utc::now());
        view.subscribed().unwrap();
        (view, poll, options)
    }

    #[test]
    fn test_state_machine_happy_path() {
        let mut view = PollView::new(Uuid::new_v4());
        assert_eq!(view.state(), ViewerState::Connecting);
        view.subscribed().unwrap();
        view.apply(&SubscriptionItem::Gap(1)).unwrap();
        assert_eq!(view.state(), ViewerState::Receiving);
        view.disconnect();
        assert_eq!(view.state(), ViewerState::Disconnected);
        view.reconnect().unwrap();
        assert_eq!(view.state(), ViewerState::Connecting);
    }

    #[test]
    fn test_events_rejected_before_subscription() {
        let mut view = PollView::new(Uuid::new_v4());
        let err = view.apply(&SubscriptionItem::Gap(1)).unwrap_err();
        assert_eq!(
            err,
            ViewError::InvalidTransition {
                from: ViewerState::Connecting,
                to: ViewerState::Receiving
            }
        );
        assert!(view.reconnect().is_err());
    }

    #[test]
    fn test_merges_events_without_refetch() {
        let (mut view, poll, options) = live_view();
        view.apply(&SubscriptionItem::Event(PollEvent::option_updated(poll.id, options[1].id, 1)))
            .unwrap();
        view.apply(&SubscriptionItem::Event(PollEvent::poll_updated(poll.id, 1, PollStatus::Active)))
            .unwrap();

        assert_eq!(view.total_votes(), 1);
        let shown = view.display_options();
        assert_eq!(shown[0].vote_count, 0);
        assert_eq!(shown[1].vote_count, 1);
        assert_eq!(shown[1].percentage, 100.0);
        assert!(!view.needs_refetch());
    }

    #[test]
    fn test_gap_requests_refetch_and_reconcile_clears_it() {
        let (mut view, poll, options) = live_view();
        view.apply(&SubscriptionItem::Gap(4)).unwrap();
        assert!(view.needs_refetch());

        view.reconcile(&poll, &options, Utc::now());
        assert!(!view.needs_refetch());
    }

    #[test]
    fn test_disconnect_keeps_last_known_state() {
        let (mut view, poll, _options) = live_view();
        view.apply(&SubscriptionItem::Event(PollEvent::poll_updated(poll.id, 7, PollStatus::Active)))
            .unwrap();
        view.disconnect();
        assert_eq!(view.total_votes(), 7);
        view.reconnect().unwrap();
        assert!(view.needs_refetch());
        assert_eq!(view.total_votes(), 7);
    }

    #[test]
    fn test_prediction_overwritten_by_authoritative_event() {
        let (mut view, poll, options) = live_view();
        view.predict_vote(options[0].id).unwrap();
        assert!(view.vote_in_flight());
        assert_eq!(view.display_total(), 1);
        assert_eq!(view.display_options()[0].vote_count, 1);

        assert_eq!(view.predict_vote(options[0].id), Err(ViewError::VoteInFlight));

        let vote = Vote {
            id: Uuid::new_v4(),
            poll_id: poll.id,
            option_id: options[0].id,
            voter_id: Uuid::new_v4(),
            cast_at: Utc::now(),
        };
        view.vote_succeeded(&vote);
        assert!(!view.vote_in_flight());
        assert_eq!(view.my_vote(), Some(options[0].id));

        // Another voter's vote landed first on the server
        view.apply(&SubscriptionItem::Event(PollEvent::option_updated(poll.id, options[0].id, 2)))
            .unwrap();
        assert_eq!(view.display_options()[0].vote_count, 2);
        assert_eq!(view.predict_vote(options[1].id), Err(ViewError::AlreadyVoted));
    }

    #[test]
    fn test_failed_vote_discards_prediction() {
        let (mut view, poll, options) = live_view();
        view.predict_vote(options[1].id).unwrap();
        view.vote_failed(&DomainError::PollClosed(poll.id));

        assert!(!view.vote_in_flight());
        assert_eq!(view.display_total(), 0);
        assert_eq!(view.status(), PollStatus::Closed);
        assert_eq!(view.predict_vote(options[1].id), Err(ViewError::PollClosed));
    }

    #[test]
    fn test_already_voted_failure_adopts_existing_vote() {
        let (mut view, poll, options) = live_view();
        view.predict_vote(options[1].id).unwrap();
        let existing = Vote {
            id: Uuid::new_v4(),
            poll_id: poll.id,
            option_id: options[0].id,
            voter_id: Uuid::new_v4(),
            cast_at: Utc::now(),
        };
        view.vote_failed(&DomainError::AlreadyVoted {
            poll_id: poll.id,
            existing: Some(Box::new(existing)),
        });
        assert_eq!(view.my_vote(), Some(options[0].id));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let (mut view, _poll, _options) = live_view();
        let stray = Uuid::new_v4();
        assert_eq!(view.predict_vote(stray), Err(ViewError::UnknownOption(stray)));
        assert!(!view.vote_in_flight());
    }
}
