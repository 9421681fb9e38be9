//! The channel registry and its dispatcher.
//!
//! A `ChannelRegistry` owns named channels, each an ordered list of
//! subscribers. Publishing a message dispatches it synchronously to a snapshot
//! of that list taken when dispatch begins:
//!
//! - subscribers added during a dispatch are first invoked on the next publish;
//! - subscribers removed during a dispatch are skipped if not yet invoked;
//! - a failing subscriber is logged and recorded, and dispatch moves on.
//!
//! Subscribers receive a `DispatchContext` holding the registry and their own
//! id, so they can publish, subscribe others, or unsubscribe themselves from
//! inside a callback.

mod dispatch;
mod registry;

pub use registry::{ChannelRegistry, SharedSubscriber};

use crate::common::SubscriberId;
use crate::error::DispatchError;
use crate::events::Message;

/// The capability every subscriber implements: handle one message.
pub trait Subscriber: Send {
    /// A short name used in logs and error reports.
    fn label(&self) -> &str {
        "subscriber"
    }

    /// Handles a message published on a channel this subscriber is on.
    ///
    /// Returning an error does not stop the dispatch; it is logged and
    /// recorded in the publisher's `DispatchReport`.
    fn handle(&mut self, ctx: &DispatchContext<'_>, message: &Message) -> anyhow::Result<()>;
}

/// Adapts a closure into a `Subscriber`.
pub(crate) struct FnSubscriber<F> {
    pub(crate) label: String,
    pub(crate) f: F,
}

impl<F> Subscriber for FnSubscriber<F>
where
    F: FnMut(&DispatchContext<'_>, &Message) -> anyhow::Result<()> + Send,
{
    fn label(&self) -> &str {
        &self.label
    }

    fn handle(&mut self, ctx: &DispatchContext<'_>, message: &Message) -> anyhow::Result<()> {
        (self.f)(ctx, message)
    }
}

/// What a subscriber can reach while it handles a message.
pub struct DispatchContext<'a> {
    /// The registry the message was published on.
    pub bus: &'a ChannelRegistry,
    /// The id of the subscriber being invoked.
    pub subscriber: SubscriberId,
}

impl DispatchContext<'_> {
    /// Removes the invoked subscriber from every channel it is on.
    pub fn unsubscribe_self(&self) -> usize {
        self.bus.unsubscribe_all(self.subscriber)
    }
}

/// The outcome of one publish.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// The channel the message was published on.
    pub channel: String,
    /// Subscribers on the channel when dispatch began.
    pub snapshot: usize,
    /// Subscribers invoked successfully.
    pub delivered: usize,
    /// Subscribers removed during dispatch before their turn came.
    pub skipped: usize,
    /// Subscribers that failed, in invocation order.
    pub failures: Vec<DispatchError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
