//! HTTP route handlers.

pub mod health;
pub mod identity;
pub mod live;
pub mod polls;
pub mod votes;
