//! Defines all configuration structures for the Tickwire engine.
//!
//! These structs are designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde` and the `config` crate. Every field has a
//! default, so a file only needs to name what it changes. Environment
//! variables prefixed with `TICKWIRE_` override the file, using `__` to reach
//! nested fields (e.g. `TICKWIRE_CHAT__SPAWN_PROBABILITY=0.2`).

use crate::error::ConfigError;
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TICKWIRE";

/// The top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the shared random source. Unset means entropy-seeded.
    pub seed: Option<u64>,

    /// Settings for the chat room scenario.
    pub chat: ChatConfig,

    /// Settings for the simulated web server scenario.
    pub server: ServerConfig,
}

/// Pacing of the tick loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Real time between ticks, in milliseconds. Zero disables the pause.
    pub tick_interval_ms: u64,

    /// Ticks per session; the budget is refilled to this value each time the
    /// operator chooses to continue.
    pub ticks_per_session: u32,
}

/// Settings for the chat room scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub schedule: SchedulerConfig,

    /// Probability per tick that a new user logs on.
    pub spawn_probability: f64,

    /// Users present when the simulation starts, in join order.
    pub initial_users: Vec<String>,

    /// Names drawn from when a user logs on mid-run.
    pub spawn_names: Vec<String>,

    /// Upper bound of a user's first countdown (lower bound is 1).
    pub first_countdown_max: u32,

    /// Upper bound of every later countdown (lower bound is 1).
    pub countdown_max: u32,

    /// A user says goodbye once it has sent more than this many messages.
    pub farewell_after: u32,
}

/// Settings for the simulated web server scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub schedule: SchedulerConfig,
    pub request_probability: f64,
    pub response_probability: f64,
    pub warning_probability: f64,
    pub error_probability: f64,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_session == 0 {
            return Err(ConfigError::Invalid(
                "ticks_per_session must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            ticks_per_session: 30,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            schedule: SchedulerConfig::default(),
            spawn_probability: 1.0 / 20.0,
            initial_users: to_strings(&["Chris", "Doug", "Jess"]),
            spawn_names: to_strings(&["Ann", "Jeff", "Mary", "Jose", "Felix", "Becca", "Heather"]),
            first_countdown_max: 10,
            countdown_max: 5,
            farewell_after: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            schedule: SchedulerConfig {
                tick_interval_ms: 500,
                ticks_per_session: 40,
            },
            request_probability: 1.0 / 4.0,
            response_probability: 1.0 / 4.0,
            warning_probability: 1.0 / 10.0,
            error_probability: 1.0 / 15.0,
        }
    }
}

impl SimConfig {
    /// Loads configuration from an optional TOML file plus environment
    /// overrides, then validates it.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let loaded: SimConfig = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let settings = defaults()?
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        let loaded: SimConfig = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chat.validate()?;
        self.server.validate()
    }
}

impl ChatConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.validate()?;
        check_probability("chat.spawn_probability", self.spawn_probability)?;
        if self.first_countdown_max == 0 || self.countdown_max == 0 {
            return Err(ConfigError::Invalid(
                "chat countdown bounds must be at least 1".to_string(),
            ));
        }
        if self.spawn_probability > 0.0 && self.spawn_names.is_empty() {
            return Err(ConfigError::Invalid(
                "chat.spawn_names can not be empty while spawning is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.validate()?;
        check_probability("server.request_probability", self.request_probability)?;
        check_probability("server.response_probability", self.response_probability)?;
        check_probability("server.warning_probability", self.warning_probability)?;
        check_probability("server.error_probability", self.error_probability)
    }
}

/// Seeds the builder with the server's pacing.
///
/// A partial `[server.schedule]` table is filled field by field from
/// `SchedulerConfig::default()`, which carries the chat pacing.
fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let server = ServerConfig::default().schedule;
    Ok(config::Config::builder()
        .set_default("server.schedule.tick_interval_ms", server.tick_interval_ms)?
        .set_default("server.schedule.ticks_per_session", server.ticks_per_session)?)
}

fn check_probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
