//! Cryptographic utilities for voter session tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix carried by every voter session token.
pub const VOTER_TOKEN_PREFIX: &str = "qv_";

/// Number of random bytes in a voter session token.
const VOTER_TOKEN_BYTES: usize = 32;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a new opaque voter session token.
///
/// Format: `qv_` followed by 32 random bytes in URL-safe base64 (no padding).
pub fn generate_voter_token() -> String {
    let mut bytes = [0u8; VOTER_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", VOTER_TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
}

/// Cheap shape check before a token is hashed and looked up.
pub fn is_well_formed_voter_token(token: &str) -> bool {
    match token.strip_prefix(VOTER_TOKEN_PREFIX) {
        Some(body) => URL_SAFE_NO_PAD
            .decode(body)
            .map(|b| b.len() == VOTER_TOKEN_BYTES)
            .unwrap_or(false),
        None => false,
    }
}
