//! Defines the messages carried by the Tickwire channels.
//!
//! This module acts as the public vocabulary of the engine. A `Message` pairs a
//! channel name with a strongly-typed `Payload`; subscribers match on the
//! payload variant they care about and ignore the rest.

use std::fmt;

/// A single published message.
///
/// Messages are immutable once published and are not queued: dispatch is
/// synchronous, so a message never outlives the `publish` call that sent it
/// unless a subscriber clones it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The channel this message was published on.
    pub channel: String,
    /// The data carried by the message.
    pub payload: Payload,
}

impl Message {
    /// Creates a new `Message` for `channel`.
    pub fn new(channel: impl Into<String>, payload: Payload) -> Self {
        Self {
            channel: channel.into(),
            payload,
        }
    }

    /// Returns the text of a `Payload::Text` message.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// The data carried by a `Message`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A scheduler tick, carrying a snapshot of the simulation state.
    Tick(TickEvent),
    /// A user with this name has joined.
    Join { name: String },
    /// Preformatted text, such as a chat line or an announcement.
    Text(String),
    /// A leveled log event.
    Log(LogEvent),
    /// A scheduler lifecycle notification.
    System(SystemEvent),
}

/// The snapshot of the simulation state published on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    /// The 1-based number of this tick since the scheduler was created.
    pub tick: u64,
    /// The tick budget left in the current session, including this tick.
    pub ticks_remaining: u32,
    /// The number of actors still subscribed to at least one channel.
    pub active_actors: usize,
}

/// Severity of a `LogEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// What a `LogEvent` is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// A new request was queued.
    RequestReceived,
    /// The oldest pending request was answered.
    ResponseSent,
    /// A response was attempted with no pending request.
    QueueUnderflow,
    /// Unusual traffic from a single address.
    TrafficWarning,
    /// The backing database went away.
    DatabaseLost,
}

/// A leveled log record published on the `log` channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub level: LogLevel,
    pub kind: LogKind,
    pub body: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, kind: LogKind, body: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            body: body.into(),
        }
    }
}

/// Events related to the lifecycle of the scheduler itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    /// Fired once when the scheduler is created.
    SessionStarted { ticks: u32 },
    /// Fired when the tick budget runs out and the operator is consulted.
    Paused { tick: u64 },
    /// Fired when the operator chose to continue.
    Resumed { ticks: u32 },
    /// Fired once when the scheduler stops for good.
    Stopped { tick: u64 },
}
