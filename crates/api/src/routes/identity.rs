//! Voter identity endpoint.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use domain::models::{IdentityResponse, IssuedIdentity};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::VoterToken;

/// Resolves the presented token or issues a new identity.
pub(crate) async fn issue_identity(
    state: &AppState,
    token: &VoterToken,
) -> Result<IssuedIdentity, ApiError> {
    let issued = state
        .service
        .identities()
        .get_or_create_identity(token.as_deref())
        .await?;

    if issued.created {
        tracing::info!(voter_id = %issued.identity.id, "Voter identity issued");
    }
    Ok(issued)
}

/// Set-Cookie headers for a freshly issued identity; empty otherwise.
pub(crate) fn cookie_headers_if_created(state: &AppState, issued: &IssuedIdentity) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if issued.created {
        state
            .cookies
            .add_voter_cookie(&mut headers, &issued.session_token);
    }
    headers
}

/// Get or create the caller's voter identity.
///
/// POST /api/v1/identity
///
/// Returns 201 with a new token when none (or an unknown one) was presented,
/// 200 otherwise. The voter cookie is refreshed either way.
pub async fn get_or_create_identity(
    State(state): State<AppState>,
    token: VoterToken,
) -> Result<(StatusCode, HeaderMap, Json<IdentityResponse>), ApiError> {
    let issued = issue_identity(&state, &token).await?;

    let mut headers = HeaderMap::new();
    state
        .cookies
        .add_voter_cookie(&mut headers, &issued.session_token);

    let status = if issued.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, headers, Json(IdentityResponse::from(&issued))))
}
