//! # Tickwire
//!
//! A tick-driven publish/subscribe simulation engine for Rust.
//!
//! Tickwire provides a cooperative scheduler that periodically publishes a
//! "tick" on a named channel. A dynamically changing set of subscribers
//! (simulated actors) react to it by publishing further messages on other
//! channels, with no direct coupling between publishers and subscribers.
//!
//! ## Core Concepts
//!
//! - **ChannelRegistry**: Owns named channels, each holding an ordered list of
//!   subscribers. Cheap to clone; every clone refers to the same registry.
//! - **Dispatch**: Publishing invokes every subscriber present when dispatch
//!   began, in subscription order. Subscribers may subscribe or unsubscribe
//!   (themselves or others) while a dispatch is in flight.
//! - **Scheduler**: Drives the timeline. Each iteration publishes a tick, rolls
//!   the scenario's world events, and counts down a tick budget. When the budget
//!   runs out it asks an `Operator` whether to continue.
//! - **Seedable randomness**: All random branching goes through a `SharedRng`,
//!   so two runs with the same seed and answers publish the same messages.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tickwire::prelude::*;
//! use tickwire::components::chat::ChatScenario;
//! use tickwire::components::sink::TracingSink;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Load the default configuration.
//!     let config = SimConfig::default();
//!
//!     // 2. Create the registry and a seeded random source.
//!     let bus = ChannelRegistry::new();
//!     let rng = SharedRng::seeded(7);
//!
//!     // 3. Attach a display sink before any actor joins.
//!     let sink = bus.register(TracingSink);
//!     for channel in [CHAT, LOGON_NOTICE, SYSTEM] {
//!         bus.subscribe(channel, sink);
//!     }
//!
//!     // 4. Build the scheduler and run it; one extra session, then stop.
//!     let scenario = ChatScenario::new(config.chat.clone());
//!     let mut scheduler =
//!         Scheduler::new(config.chat.schedule.clone(), bus, rng, scenario)?;
//!     scheduler.run(&mut SessionLimit::new(1)).await?;
//!
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Tickwire";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod bus;
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod operator;
pub mod random;

/// A prelude module for easy importing of the most common Tickwire types.
pub mod prelude {
    pub use crate::bus::{ChannelRegistry, DispatchContext, DispatchReport, Subscriber};
    pub use crate::common::{SubscriberId, CHAT, LOG, LOGON, LOGON_NOTICE, SYSTEM, TICK};
    pub use crate::config::{ChatConfig, SchedulerConfig, ServerConfig, SimConfig};
    pub use crate::engine::{Scenario, Scheduler, SchedulerState, SimulationState, World};
    pub use crate::error::{ConfigError, DispatchError, SchedulerError};
    pub use crate::events::{
        LogEvent, LogKind, LogLevel, Message, Payload, SystemEvent, TickEvent,
    };
    pub use crate::operator::{CheckpointPrompt, Operator, ScriptedOperator, SessionLimit};
    pub use crate::random::{RandomSource, SharedRng};
}
