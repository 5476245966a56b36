//! Live update channel.
//!
//! One broadcast channel per poll, created on first subscription and removed
//! when the last subscription for that poll is dropped. Publishing never
//! blocks; slow subscribers lose the oldest events and observe a
//! [`SubscriptionItem::Gap`] instead, after which they should refetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::models::PollEvent;

/// Default number of buffered events per poll channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
struct HubInner {
    capacity: usize,
    channels: Mutex<HashMap<Uuid, broadcast::Sender<PollEvent>>>,
}

/// Fan-out of poll change events to live subscribers.
#[derive(Debug, Clone)]
pub struct LiveUpdateHub {
    inner: Arc<HubInner>,
}

impl Default for LiveUpdateHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl LiveUpdateHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                capacity: capacity.max(1),
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribes to all events of one poll.
    ///
    /// Only events published after this call are delivered.
    pub fn subscribe(&self, poll_id: Uuid) -> Subscription {
        let mut channels = self
            .inner
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let receiver = channels
            .entry(poll_id)
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .subscribe();

        tracing::debug!(poll_id = %poll_id, "Live subscription opened");

        Subscription {
            poll_id,
            hub: Arc::downgrade(&self.inner),
            receiver: Some(receiver),
        }
    }

    /// Delivers an event to every current subscriber of its poll.
    ///
    /// Returns the number of subscribers the event was queued for.
    pub fn publish(&self, event: PollEvent) -> usize {
        let channels = self
            .inner
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match channels.get(&event.poll_id) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self, poll_id: Uuid) -> usize {
        self.inner
            .channels
            .lock()
            .map(|c| c.get(&poll_id).map_or(0, |s| s.receiver_count()))
            .unwrap_or(0)
    }

    /// Number of polls with at least one open channel.
    pub fn active_channels(&self) -> usize {
        self.inner.channels.lock().map(|c| c.len()).unwrap_or(0)
    }
}

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionItem {
    Event(PollEvent),
    /// The subscriber fell behind and this many events were dropped.
    Gap(u64),
}

/// A live subscription to one poll. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct Subscription {
    poll_id: Uuid,
    hub: Weak<HubInner>,
    /// Taken on drop.
    receiver: Option<broadcast::Receiver<PollEvent>>,
}

impl Subscription {
    pub fn poll_id(&self) -> Uuid {
        self.poll_id
    }

    /// Waits for the next item. `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<SubscriptionItem> {
        let receiver = self.receiver.as_mut()?;
        match receiver.recv().await {
            Ok(event) => Some(SubscriptionItem::Event(event)),
            Err(RecvError::Lagged(missed)) => {
                tracing::debug!(poll_id = %self.poll_id, missed, "Live subscriber lagged");
                Some(SubscriptionItem::Gap(missed))
            }
            Err(RecvError::Closed) => None,
        }
    }

    /// Non-blocking variant of [`Subscription::next`].
    pub fn try_next(&mut self) -> Option<SubscriptionItem> {
        use tokio::sync::broadcast::error::TryRecvError;

        let receiver = self.receiver.as_mut()?;
        match receiver.try_recv() {
            Ok(event) => Some(SubscriptionItem::Event(event)),
            Err(TryRecvError::Lagged(missed)) => Some(SubscriptionItem::Gap(missed)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Ends the subscription. Equivalent to dropping it.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        let Ok(mut channels) = hub.channels.lock() else {
            return;
        };
        // Release our receiver under the lock so concurrent drops see it gone.
        drop(self.receiver.take());
        let last = channels
            .get(&self.poll_id)
            .is_some_and(|sender| sender.receiver_count() == 0);
        if last {
            channels.remove(&self.poll_id);
            tracing::debug!(poll_id = %self.poll_id, "Live channel removed");
        }
    }
}
