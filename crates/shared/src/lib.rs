//! Shared utilities for the QuickPoll backend.
//!
//! This crate provides:
//! - Voter session token generation and hashing
//! - Common validation logic

pub mod crypto;
pub mod validation;
