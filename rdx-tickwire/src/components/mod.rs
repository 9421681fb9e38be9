//! Contains the actors and sinks that populate a simulation.
//!
//! Actors subscribe to the `tick` channel and react by publishing on other
//! channels; sinks only listen. The `Scheduler` never talks to either
//! directly, everything flows through the `ChannelRegistry`.

pub mod chat;
pub mod server;
pub mod sink;
