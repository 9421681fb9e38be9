use anyhow::{bail, Result};
use std::path::PathBuf;
use tickwire::components::chat::ChatScenario;
use tickwire::components::server::ServerScenario;
use tickwire::components::sink::TracingSink;
use tickwire::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 2. Parse `tickdev [chat|server] [config.toml]`.
    let mut args = std::env::args().skip(1);
    let scenario = args.next().unwrap_or_else(|| "chat".to_string());
    let config_path = args.next().map(PathBuf::from);
    let config = SimConfig::load(config_path.as_deref())?;

    // 3. Create the registry and attach a tracing sink to every output channel.
    let bus = ChannelRegistry::new();
    let sink = bus.register(TracingSink);
    for channel in [CHAT, LOGON_NOTICE, LOG, SYSTEM] {
        bus.subscribe(channel, sink);
    }
    let rng = SharedRng::from_seed_option(config.seed);

    // 4. Build the scheduler for the requested scenario.
    let mut scheduler = match scenario.as_str() {
        "chat" => Scheduler::new(
            config.chat.schedule.clone(),
            bus,
            rng,
            ChatScenario::new(config.chat.clone()),
        )?,
        "server" => Scheduler::new(
            config.server.schedule.clone(),
            bus,
            rng,
            ServerScenario::new(config.server.clone()),
        )?,
        other => bail!("unknown scenario '{other}', expected 'chat' or 'server'"),
    };

    // 5. Run one extra session after the first, then stop.
    let summary = scheduler.run(&mut SessionLimit::new(1)).await?;
    info!(
        ticks = summary.ticks,
        sessions = summary.sessions,
        "{} v{} finished",
        tickwire::ENGINE_NAME,
        tickwire::VERSION
    );

    Ok(())
}
