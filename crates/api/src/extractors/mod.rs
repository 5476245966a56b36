//! Custom Axum extractors.

pub mod voter;

pub use voter::{Voter, VoterToken, VOTER_TOKEN_HEADER};
