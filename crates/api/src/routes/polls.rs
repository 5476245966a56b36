//! Poll endpoint handlers.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use domain::models::{
    CreatePollRequest, IdentityResponse, Poll, PollOption, PollResponse, PollResults,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{Voter, VoterToken};
use crate::middleware::metrics::record_poll_created;
use crate::routes::identity::{cookie_headers_if_created, issue_identity};

#[derive(Debug, Serialize)]
pub struct CreatePollResponse {
    pub poll: PollResponse,
    pub options: Vec<PollOption>,
    /// Present only when the request issued a new creator identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityResponse>,
}

fn poll_response(state: &AppState, poll: &Poll) -> PollResponse {
    let response = PollResponse::from_poll(poll, state.service.now());
    match state.config.public_base_url() {
        Some(base_url) => response.with_share_url(base_url),
        None => response,
    }
}

/// Create a poll.
///
/// POST /api/v1/polls
///
/// The caller becomes the creator; an identity is issued when none is
/// presented and the request is valid.
pub async fn create_poll(
    State(state): State<AppState>,
    token: VoterToken,
    Json(request): Json<CreatePollRequest>,
) -> Result<(StatusCode, HeaderMap, Json<CreatePollResponse>), ApiError> {
    state.service.check_poll_request(&request)?;
    let issued = issue_identity(&state, &token).await?;
    let (poll, options) = state
        .service
        .create_poll(request, issued.identity.id)
        .await?;

    record_poll_created();

    let response = CreatePollResponse {
        poll: poll_response(&state, &poll),
        options,
        identity: issued.created.then(|| IdentityResponse::from(&issued)),
    };

    Ok((
        StatusCode::CREATED,
        cookie_headers_if_created(&state, &issued),
        Json(response),
    ))
}

/// Get a poll with its effective status.
///
/// GET /api/v1/polls/:poll_id
pub async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Result<Json<PollResponse>, ApiError> {
    let poll = state.service.get_poll(poll_id).await?;
    Ok(Json(poll_response(&state, &poll)))
}

/// List a poll's options in display order.
///
/// GET /api/v1/polls/:poll_id/options
pub async fn list_options(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Result<Json<Vec<PollOption>>, ApiError> {
    Ok(Json(state.service.list_options(poll_id).await?))
}

/// Vote counts and percentages.
///
/// GET /api/v1/polls/:poll_id/results
pub async fn get_results(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Result<Json<PollResults>, ApiError> {
    let mut results = state.service.results(poll_id).await?;
    if let Some(base_url) = state.config.public_base_url() {
        results.poll = results.poll.with_share_url(base_url);
    }
    Ok(Json(results))
}

/// Close a poll. Creator only.
///
/// POST /api/v1/polls/:poll_id/close
pub async fn close_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
    Voter(voter): Voter,
) -> Result<Json<PollResponse>, ApiError> {
    let poll = state.service.close_poll(poll_id, voter.id).await?;
    Ok(Json(poll_response(&state, &poll)))
}
