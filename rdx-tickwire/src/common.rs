//! Contains common, primitive types shared across the engine.
//!
//! This module defines the identity type used to address subscribers and the
//! names of the well-known channels the built-in scenarios publish on. Channels
//! are plain strings, so applications are free to invent their own.

use slotmap::new_key_type;

new_key_type! {
    /// Uniquely and safely identifies a registered subscriber.
    ///
    /// This key is returned when a subscriber is registered with a
    /// `ChannelRegistry`. It is the identity used for targeted unsubscription
    /// and is never reused, so a stale id can not address a newer subscriber.
    pub struct SubscriberId;
}

/// The scheduler publishes a `TickEvent` here once per iteration.
pub const TICK: &str = "tick";

/// Chat lines spoken by simulated users.
pub const CHAT: &str = "chat";

/// Carries the name of a user who has just joined, so others can greet them.
pub const LOGON: &str = "logon";

/// Human-readable "has logged on" announcements.
pub const LOGON_NOTICE: &str = "logon_notice";

/// Leveled log events produced by the simulated server.
pub const LOG: &str = "log";

/// Scheduler lifecycle notifications.
pub const SYSTEM: &str = "system";
