//! A simulated web server that reports its activity as log events.

use crate::bus::{ChannelRegistry, DispatchContext, Subscriber};
use crate::common::{SubscriberId, LOG, TICK};
use crate::config::ServerConfig;
use crate::engine::{Scenario, World};
use crate::events::{LogEvent, LogKind, LogLevel, Message, Payload};
use crate::random::SharedRng;
use std::collections::VecDeque;
use std::fmt;

const PAGES: &[&str] = &[
    "home",
    "about",
    "forums",
    "events/picnic",
    "events",
    "events/pool_party",
    "events/programming_class",
];

const USER_AGENTS: &[&str] = &["Mozilla", "Edge", "Chrome", "Safari"];

/// A dotted-quad address drawn from the simulated client range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ip([u32; 4]);

impl Ip {
    pub fn random(rng: &SharedRng) -> Self {
        Ip([
            rng.range_inclusive(20, 250),
            rng.range_inclusive(5, 250),
            rng.range_inclusive(20, 250),
            rng.range_inclusive(20, 250),
        ])
    }
}

impl fmt::Display for Ip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// A pending client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub ip: Ip,
    pub request: String,
    pub user_agent: String,
    /// The tick the request arrived on.
    pub received_tick: u64,
}

impl Connection {
    pub fn random(rng: &SharedRng, received_tick: u64) -> Self {
        let page = rng.pick(PAGES).copied().unwrap_or("home");
        let user_agent = rng.pick(USER_AGENTS).copied().unwrap_or("Mozilla");
        Self {
            ip: Ip::random(rng),
            request: format!("my_cool_website/{page}.html"),
            user_agent: user_agent.to_string(),
            received_tick,
        }
    }
}

/// The server actor. Subscribed to `tick` only, publishes on `log`.
pub struct SimulatedServer {
    config: ServerConfig,
    rng: SharedRng,
    pending: VecDeque<Connection>,
}

impl SimulatedServer {
    pub fn new(config: ServerConfig, rng: SharedRng) -> Self {
        Self {
            config,
            rng,
            pending: VecDeque::new(),
        }
    }

    /// Registers a server on `bus` and subscribes it to `tick`.
    pub fn start(bus: &ChannelRegistry, rng: &SharedRng, config: ServerConfig) -> SubscriberId {
        let id = bus.register(Self::new(config, rng.clone()));
        bus.subscribe(TICK, id);
        id
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Rolls the four trials in a fixed order: request, response, warning,
    /// critical error.
    fn on_tick(&mut self, bus: &ChannelRegistry, tick: u64) {
        if self.rng.chance(self.config.request_probability) {
            let connection = Connection::random(&self.rng, tick);
            let body = format!(
                "Request Received:\n    IP: {},\n    Request: {},\n    User-Agent: {}",
                connection.ip, connection.request, connection.user_agent
            );
            log(bus, LogLevel::Info, LogKind::RequestReceived, body);
            self.pending.push_back(connection);
        }

        if self.rng.chance(self.config.response_probability) {
            match self.pending.pop_front() {
                Some(connection) => {
                    let body = format!(
                        "Response Sent:\n    IP: {},\n    Data: {},\n    Received: tick {}",
                        connection.ip, connection.request, connection.received_tick
                    );
                    log(bus, LogLevel::Info, LogKind::ResponseSent, body);
                }
                None => log(
                    bus,
                    LogLevel::Critical,
                    LogKind::QueueUnderflow,
                    "ERROR: Tried to respond to a request that does not exist.",
                ),
            }
        }

        if self.rng.chance(self.config.warning_probability) {
            let body = format!(
                "WARNING: High volumes of traffic are being generated from this ip: {}",
                Ip::random(&self.rng)
            );
            log(bus, LogLevel::Warning, LogKind::TrafficWarning, body);
        }

        if self.rng.chance(self.config.error_probability) {
            let body = format!(
                "CRITICAL: Lost connection to SQL server at this ip: {}",
                Ip::random(&self.rng)
            );
            log(bus, LogLevel::Critical, LogKind::DatabaseLost, body);
        }
    }
}

fn log(bus: &ChannelRegistry, level: LogLevel, kind: LogKind, body: impl Into<String>) {
    bus.publish(LOG, Payload::Log(LogEvent::new(level, kind, body)));
}

impl Subscriber for SimulatedServer {
    fn label(&self) -> &str {
        "server"
    }

    fn handle(&mut self, ctx: &DispatchContext<'_>, message: &Message) -> anyhow::Result<()> {
        if let Payload::Tick(tick) = &message.payload {
            self.on_tick(ctx.bus, tick.tick);
        }
        Ok(())
    }
}

/// The server world: one server, no other world events.
pub struct ServerScenario {
    config: ServerConfig,
}

impl ServerScenario {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

impl Scenario for ServerScenario {
    fn label(&self) -> &str {
        "server"
    }

    fn populate(&mut self, world: &mut World<'_>) -> anyhow::Result<()> {
        let id = SimulatedServer::start(world.bus, world.rng, self.config.clone());
        world.enlist(id, "server");
        Ok(())
    }

    fn world_events(&mut self, _world: &mut World<'_>) {}
}
