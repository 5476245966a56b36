//! Voter identity extractors.
//!
//! The voter token is read from the `X-Voter-Token` header first, then from
//! the voter cookie.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::VoterIdentity;

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying the voter token for non-browser clients.
pub const VOTER_TOKEN_HEADER: &str = "X-Voter-Token";

/// Raw voter token presented by the client, if any. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct VoterToken(pub Option<String>);

impl VoterToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for VoterToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(VOTER_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let token = from_header
            .or_else(|| state.cookies.extract_voter_token(&parts.headers))
            .map(str::to_string);

        Ok(VoterToken(token))
    }
}

/// An existing voter identity. Rejects with 401 when the token is missing or
/// unknown.
#[derive(Debug, Clone)]
pub struct Voter(pub VoterIdentity);

#[async_trait]
impl FromRequestParts<AppState> for Voter {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let VoterToken(token) = VoterToken::from_request_parts(parts, state).await?;
        let token = token.ok_or_else(|| {
            ApiError::Unauthorized("Missing voter token".to_string())
        })?;

        state
            .service
            .identities()
            .resolve(&token)
            .await?
            .map(Voter)
            .ok_or_else(|| ApiError::Unauthorized("Unknown voter token".to_string()))
    }
}
