//! Domain layer for QuickPoll.
//!
//! This crate contains:
//! - Domain models (Poll, PollOption, Vote, VoterIdentity, live events)
//! - Store ports and an in-memory backend
//! - Business logic services (poll service, tally engine, live updates)
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;

pub use errors::DomainError;
