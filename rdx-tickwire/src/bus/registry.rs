//! Channel bookkeeping: which subscribers exist and which channels they are on.

use super::{dispatch, DispatchReport, FnSubscriber, Subscriber};
use crate::common::SubscriberId;
use crate::events::{Message, Payload};
use slotmap::SlotMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A registered subscriber, shared between the registry and in-flight
/// dispatches.
pub type SharedSubscriber = Arc<Mutex<dyn Subscriber>>;

struct Slot {
    label: String,
    handler: SharedSubscriber,
}

#[derive(Default)]
struct RegistryInner {
    slots: SlotMap<SubscriberId, Slot>,
    channels: HashMap<String, Vec<SubscriberId>>,
}

/// Owns the named channels and their ordered subscriber lists.
///
/// The registry is cheap to clone; every clone refers to the same channels.
/// The internal lock is only held for bookkeeping and is released before any
/// subscriber runs, which is what lets subscribers mutate the registry from
/// inside a dispatch.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a subscriber and returns its identity. The subscriber is on
    /// no channel until `subscribe` is called.
    pub fn register<S: Subscriber + 'static>(&self, subscriber: S) -> SubscriberId {
        let label = subscriber.label().to_string();
        let handler: SharedSubscriber = Arc::new(Mutex::new(subscriber));
        let id = self.lock().slots.insert(Slot {
            label: label.clone(),
            handler,
        });
        debug!(?id, %label, "subscriber registered");
        id
    }

    /// Registers a closure as a subscriber.
    pub fn register_fn<F>(&self, label: &str, f: F) -> SubscriberId
    where
        F: FnMut(&super::DispatchContext<'_>, &Message) -> anyhow::Result<()> + Send + 'static,
    {
        self.register(FnSubscriber {
            label: label.to_string(),
            f,
        })
    }

    /// Appends `id` to `channel`, creating the channel if needed.
    ///
    /// Returns `false` without changing anything if `id` is already on the
    /// channel (its original position is kept) or is not registered.
    pub fn subscribe(&self, channel: &str, id: SubscriberId) -> bool {
        let mut inner = self.lock();
        if !inner.slots.contains_key(id) {
            debug!(?id, channel, "subscribe ignored: unknown subscriber");
            return false;
        }
        let members = inner.channels.entry(channel.to_string()).or_default();
        if members.contains(&id) {
            return false;
        }
        members.push(id);
        debug!(?id, channel, "subscribed");
        true
    }

    /// Removes `id` from `channel`. Unknown channels and ids are a no-op.
    ///
    /// Safe to call from inside a subscriber, including one currently being
    /// dispatched on `channel`.
    pub fn unsubscribe(&self, channel: &str, id: SubscriberId) -> bool {
        let mut inner = self.lock();
        let Some(members) = inner.channels.get_mut(channel) else {
            return false;
        };
        let before = members.len();
        members.retain(|member| *member != id);
        let removed = members.len() != before;
        if removed {
            debug!(?id, channel, "unsubscribed");
        }
        removed
    }

    /// Removes `id` from every channel and retires it, so it can never be
    /// subscribed again. Returns how many channels it was removed from.
    pub fn unsubscribe_all(&self, id: SubscriberId) -> usize {
        let mut inner = self.lock();
        let mut removed = 0;
        for members in inner.channels.values_mut() {
            let before = members.len();
            members.retain(|member| *member != id);
            removed += before - members.len();
        }
        if let Some(slot) = inner.slots.remove(id) {
            debug!(?id, label = %slot.label, channels = removed, "subscriber retired");
        }
        removed
    }

    /// Publishes `payload` on `channel` and dispatches it before returning.
    pub fn publish(&self, channel: &str, payload: Payload) -> DispatchReport {
        dispatch::dispatch(self, &Message::new(channel, payload))
    }

    /// Returns `true` if `id` is registered and not yet retired.
    pub fn is_registered(&self, id: SubscriberId) -> bool {
        self.lock().slots.contains_key(id)
    }

    pub fn is_subscribed(&self, channel: &str, id: SubscriberId) -> bool {
        self.lock()
            .channels
            .get(channel)
            .is_some_and(|members| members.contains(&id))
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.lock().channels.get(channel).map_or(0, Vec::len)
    }

    /// The names of every channel created so far, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().channels.keys().cloned().collect();
        names.sort();
        names
    }

    /// Takes the dispatch snapshot for `channel`, creating it if absent.
    pub(super) fn snapshot(&self, channel: &str) -> Vec<SubscriberId> {
        self.lock()
            .channels
            .entry(channel.to_string())
            .or_default()
            .clone()
    }

    /// Looks up a snapshot member just before it is invoked. Returns `None`
    /// if it has left `channel` since the snapshot was taken.
    pub(super) fn resolve(
        &self,
        channel: &str,
        id: SubscriberId,
    ) -> Option<(String, SharedSubscriber)> {
        let inner = self.lock();
        let still_subscribed = inner
            .channels
            .get(channel)
            .is_some_and(|members| members.contains(&id));
        if !still_subscribed {
            return None;
        }
        inner
            .slots
            .get(id)
            .map(|slot| (slot.label.clone(), Arc::clone(&slot.handler)))
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ChannelRegistry")
            .field("subscribers", &inner.slots.len())
            .field("channels", &inner.channels.len())
            .finish()
    }
}
