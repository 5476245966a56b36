//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod poll;
pub mod poll_option;
pub mod vote;
pub mod voter_identity;

pub use poll::PollEntity;
pub use poll_option::PollOptionEntity;
pub use vote::{OptionCountEntity, VoteEntity};
pub use voter_identity::VoterIdentityEntity;
