//! Display and log sinks.
//!
//! Sinks subscribe to the channels they render and never mutate a payload.

use crate::bus::{DispatchContext, Subscriber};
use crate::events::{LogLevel, Message, Payload};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

/// Records every message it receives, in dispatch order.
///
/// Clones share the same record, so register one clone and read from another.
#[derive(Clone, Default)]
pub struct Transcript {
    entries: Arc<Mutex<Vec<Message>>>,
}

impl Transcript {
    pub fn messages(&self) -> Vec<Message> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The text of every `Payload::Text` message received.
    pub fn texts(&self) -> Vec<String> {
        self.messages()
            .iter()
            .filter_map(|message| message.text().map(str::to_string))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Subscriber for Transcript {
    fn label(&self) -> &str {
        "transcript"
    }

    fn handle(&mut self, _ctx: &DispatchContext<'_>, message: &Message) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}

/// Renders messages through `tracing`, one event per message.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Subscriber for TracingSink {
    fn label(&self) -> &str {
        "tracing-sink"
    }

    fn handle(&mut self, _ctx: &DispatchContext<'_>, message: &Message) -> anyhow::Result<()> {
        let channel = message.channel.as_str();
        match &message.payload {
            Payload::Text(text) => info!(channel, "{text}"),
            Payload::Log(event) => match event.level {
                LogLevel::Info => info!(channel, kind = ?event.kind, "{}", event.body),
                LogLevel::Warning => warn!(channel, kind = ?event.kind, "{}", event.body),
                LogLevel::Critical => error!(channel, kind = ?event.kind, "{}", event.body),
            },
            Payload::System(event) => info!(channel, "{event:?}"),
            Payload::Join { name } => info!(channel, %name, "joined"),
            Payload::Tick(tick) => info!(
                channel,
                tick = tick.tick,
                remaining = tick.ticks_remaining,
                "tick"
            ),
        }
        Ok(())
    }
}
