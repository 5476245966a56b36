//! Live update stream (Server-Sent Events).

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use domain::services::{Subscription, SubscriptionItem};
use futures_util::stream::{self, Stream};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_live_subscription_opened;

/// SSE event name telling the client it missed events and must refetch.
pub const GAP_EVENT: &str = "gap";

fn to_sse_event(item: &SubscriptionItem) -> Event {
    match item {
        SubscriptionItem::Event(event) => Event::default()
            .event(event.name())
            .json_data(event)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to encode live event");
                Event::default().event(GAP_EVENT).data(r#"{"missed":1}"#)
            }),
        SubscriptionItem::Gap(missed) => Event::default()
            .event(GAP_EVENT)
            .data(format!(r#"{{"missed":{}}}"#, missed)),
    }
}

fn event_stream(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(subscription, |mut subscription| async move {
        let item = subscription.next().await?;
        Some((Ok(to_sse_event(&item)), subscription))
    })
}

/// Subscribe to a poll's live events.
///
/// GET /api/v1/polls/:poll_id/events
///
/// Dropping the connection drops the subscription.
pub async fn poll_events(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let subscription = state.service.subscribe(poll_id).await?;
    record_live_subscription_opened();

    let keep_alive =
        KeepAlive::new().interval(Duration::from_secs(state.config.live.keepalive_secs));

    Ok(Sse::new(event_stream(subscription)).keep_alive(keep_alive))
}
