//! Repository implementations for database operations.

pub mod poll;
pub mod poll_option;
pub mod vote;
pub mod voter_identity;

pub use poll::PollRepository;
pub use poll_option::PollOptionRepository;
pub use vote::VoteRepository;
pub use voter_identity::VoterIdentityRepository;
