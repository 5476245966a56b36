//! Domain models for QuickPoll.

pub mod event;
pub mod poll;
pub mod poll_option;
pub mod results;
pub mod vote;
pub mod voter;

pub use event::{Collection, EventScope, PollEvent, PollEventKind};
pub use poll::{
    is_expired, ChoiceMode, CreatePollRequest, NewPoll, Poll, PollResponse, PollStatus, PollTtl,
    Visibility,
};
pub use poll_option::{NewPollOption, OptionInput, PollOption};
pub use results::{OptionResult, PollResults};
pub use vote::{CastVoteRequest, NewVote, Vote, VoteResponse};
pub use voter::{IdentityResponse, IssuedIdentity, VoterIdentity};
