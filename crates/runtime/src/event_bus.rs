use std::collections::BTreeMap;

use tracing::trace;

use crate::turn::Turn;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// One event routed to one subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<S, K, E> {
    pub turn_index: u64,
    pub subscription: SubscriptionId,
    pub subscriber: S,
    pub channel: K,
    pub event: E,
}

#[derive(Debug, Clone)]
struct Subscription<S, K> {
    subscriber: S,
    channel: K,
}

/// Typed publish/subscribe with queued delivery.
///
/// Channels are plain values (`K`), never formatted strings. Publishing does
/// not call back into subscribers; it queues one [`Delivery`] per matching
/// subscription, and the owner drains and dispatches them. This keeps
/// delivery on the single event-loop thread and free of re-entrancy.
///
/// Ordering contract:
/// - Deliveries drain in publish order.
/// - Within one publish, subscriptions are visited in subscription order.
#[derive(Debug)]
pub struct EventBus<S, K, E> {
    next_id: u64,
    subscriptions: BTreeMap<SubscriptionId, Subscription<S, K>>,
    queue: Vec<Delivery<S, K, E>>,
}

impl<S, K, E> Default for EventBus<S, K, E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscriptions: BTreeMap::new(),
            queue: Vec::new(),
        }
    }
}

impl<S, K, E> EventBus<S, K, E>
where
    S: Clone + PartialEq + std::fmt::Debug,
    K: Clone + PartialEq + std::fmt::Debug,
    E: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: S, channel: K) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.subscriptions
            .insert(id, Subscription { subscriber, channel });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Drops every subscription owned by `subscriber`, plus any deliveries
    /// already queued for it. Returns the number of subscriptions removed.
    pub fn unsubscribe_all(&mut self, subscriber: &S) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|_, s| s.subscriber != *subscriber);
        self.queue.retain(|d| d.subscriber != *subscriber);
        before - self.subscriptions.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Queues `event` for every subscription on `channel`. Returns the number
    /// of deliveries queued.
    pub fn publish(&mut self, turn: Turn, channel: K, event: E) -> usize {
        let mut queued = 0;
        for (id, sub) in &self.subscriptions {
            if sub.channel != channel {
                continue;
            }
            self.queue.push(Delivery {
                turn_index: turn.index,
                subscription: *id,
                subscriber: sub.subscriber.clone(),
                channel: channel.clone(),
                event: event.clone(),
            });
            queued += 1;
        }
        if queued == 0 {
            trace!(?channel, "event published with no subscribers");
        }
        queued
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn drain(&mut self) -> Vec<Delivery<S, K, E>> {
        std::mem::take(&mut self.queue)
    }
}
