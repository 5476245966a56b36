//! Vote endpoint handlers.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use domain::errors::DomainError;
use domain::models::{CastVoteRequest, IdentityResponse, VoteResponse};
use domain::services::TallySnapshot;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::VoterToken;
use crate::middleware::metrics::{
    record_tally_update_failure, record_vote_cast, record_vote_rejected,
};
use crate::routes::identity::{cookie_headers_if_created, issue_identity};

#[derive(Debug, Serialize)]
pub struct CastVoteResponse {
    pub vote: VoteResponse,
    /// Counts right after this vote; null when the tally update is pending
    /// reconciliation.
    pub tally: Option<TallySnapshot>,
    /// Present only when the request issued a new voter identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityResponse>,
}

fn rejected(poll_id: Uuid, e: DomainError) -> ApiError {
    record_vote_rejected(e.reason());
    tracing::debug!(poll_id = %poll_id, reason = e.reason(), "Vote rejected");
    e.into()
}

/// Cast a vote.
///
/// POST /api/v1/polls/:poll_id/votes
///
/// Rejected votes never issue an identity. A committed vote is reported as
/// 201 even when the tally update behind it failed.
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
    token: VoterToken,
    Json(request): Json<CastVoteRequest>,
) -> Result<(StatusCode, HeaderMap, Json<CastVoteResponse>), ApiError> {
    let poll = state
        .service
        .check_vote_target(poll_id, request.option_id)
        .await
        .map_err(|e| rejected(poll_id, e))?;

    let issued = issue_identity(&state, &token).await?;

    let outcome = state
        .service
        .record_vote(&poll, request.option_id, issued.identity.id)
        .await
        .map_err(|e| rejected(poll_id, e))?;

    record_vote_cast();
    if outcome.tally.is_err() {
        record_tally_update_failure();
    }

    let response = CastVoteResponse {
        vote: outcome.vote.into(),
        tally: outcome.tally.ok(),
        identity: issued.created.then(|| IdentityResponse::from(&issued)),
    };

    Ok((
        StatusCode::CREATED,
        cookie_headers_if_created(&state, &issued),
        Json(response),
    ))
}

/// The caller's vote in this poll, or `null`.
///
/// GET /api/v1/polls/:poll_id/votes/me
pub async fn my_vote(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
    token: VoterToken,
) -> Result<Json<Option<VoteResponse>>, ApiError> {
    let voter = match token.as_deref() {
        Some(token) => state.service.identities().resolve(token).await?,
        None => None,
    };

    let Some(voter) = voter else {
        // Still report unknown polls as such.
        state.service.get_poll(poll_id).await?;
        return Ok(Json(None));
    };

    let vote = state.service.my_vote(poll_id, voter.id).await?;
    Ok(Json(vote.map(VoteResponse::from)))
}
