//! Error types for the Tickwire engine.
//!
//! None of these are fatal to a running simulation. Dispatch errors are
//! recovered per subscriber and only surface in a `DispatchReport`; scheduler
//! errors come from misuse of the state machine or a bad configuration.

use crate::engine::SchedulerState;
use thiserror::Error;

/// A subscriber failed while a message was being dispatched to it.
///
/// Dispatch continues with the remaining subscribers; the error is logged and
/// recorded in the `DispatchReport`, never returned to the publisher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("subscriber '{subscriber}' failed on channel '{channel}': {source}")]
    Handler {
        channel: String,
        subscriber: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "subscriber '{subscriber}' is already handling a message; \
         reentrant dispatch on '{channel}' skipped"
    )]
    Reentrant { channel: String, subscriber: String },
}

/// Errors raised by the `Scheduler`.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: SchedulerState,
        actual: SchedulerState,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scenario setup failed: {0}")]
    Setup(#[source] anyhow::Error),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
