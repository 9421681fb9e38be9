//! End-to-end behaviour of the tick loop with the built-in scenarios.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tickwire::components::chat::ChatScenario;
use tickwire::components::server::ServerScenario;
use tickwire::components::sink::Transcript;
use tickwire::prelude::*;

fn no_pause(ticks: u32) -> SchedulerConfig {
    SchedulerConfig {
        tick_interval_ms: 0,
        ticks_per_session: ticks,
    }
}

fn count_ticks(bus: &ChannelRegistry) -> Arc<AtomicU64> {
    let count = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&count);
    let id = bus.register_fn("tick-counter", move |_: &DispatchContext<'_>, _: &Message| {
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    });
    bus.subscribe(TICK, id);
    count
}

fn record(bus: &ChannelRegistry, channels: &[&str]) -> Transcript {
    let transcript = Transcript::default();
    let id = bus.register(transcript.clone());
    for channel in channels {
        bus.subscribe(channel, id);
    }
    transcript
}

struct Idle;

impl Scenario for Idle {
    fn label(&self) -> &str {
        "idle"
    }

    fn populate(&mut self, _world: &mut World<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn world_events(&mut self, _world: &mut World<'_>) {}
}

#[test]
fn test_stop_at_checkpoint_publishes_no_more_ticks() {
    let bus = ChannelRegistry::new();
    let ticks = count_ticks(&bus);
    let mut scheduler = Scheduler::new(no_pause(3), bus, SharedRng::seeded(0), Idle).unwrap();

    for _ in 0..3 {
        scheduler.step().unwrap();
    }
    assert_eq!(scheduler.state(), SchedulerState::AwaitingContinue);
    assert_eq!(ticks.load(Ordering::Relaxed), 3);

    let mut operator = ScriptedOperator::new([false]);
    assert_eq!(
        scheduler.resolve_checkpoint(&mut operator).unwrap(),
        SchedulerState::Stopped
    );
    assert!(scheduler.step().is_err());
    assert!(scheduler.resolve_checkpoint(&mut operator).is_err());
    assert_eq!(ticks.load(Ordering::Relaxed), 3);
}

#[test]
fn test_system_events_follow_the_state_machine() {
    let bus = ChannelRegistry::new();
    let transcript = record(&bus, &[SYSTEM]);
    let mut scheduler = Scheduler::new(no_pause(1), bus, SharedRng::seeded(0), Idle).unwrap();

    scheduler.step().unwrap();
    scheduler
        .resolve_checkpoint(&mut ScriptedOperator::new([true]))
        .unwrap();
    scheduler.step().unwrap();
    scheduler
        .resolve_checkpoint(&mut ScriptedOperator::new([false]))
        .unwrap();

    let events: Vec<SystemEvent> = transcript
        .messages()
        .into_iter()
        .filter_map(|message| match message.payload {
            Payload::System(event) => Some(event),
            _ => None,
        })
        .collect();
    assert_eq!(
        events,
        vec![
            SystemEvent::SessionStarted { ticks: 1 },
            SystemEvent::Paused { tick: 1 },
            SystemEvent::Resumed { ticks: 1 },
            SystemEvent::Paused { tick: 2 },
            SystemEvent::Stopped { tick: 2 },
        ]
    );
}

#[test]
fn test_server_underflow_is_logged_not_raised() {
    let config = ServerConfig {
        schedule: no_pause(5),
        request_probability: 0.0,
        response_probability: 1.0,
        warning_probability: 0.0,
        error_probability: 0.0,
    };
    let bus = ChannelRegistry::new();
    let log = record(&bus, &[LOG]);
    let mut scheduler = Scheduler::new(
        config.schedule.clone(),
        bus,
        SharedRng::seeded(3),
        ServerScenario::new(config),
    )
    .unwrap();

    assert_eq!(scheduler.step().unwrap(), SchedulerState::Running);
    assert_eq!(scheduler.step().unwrap(), SchedulerState::Running);

    let events: Vec<LogEvent> = log
        .messages()
        .into_iter()
        .filter_map(|message| match message.payload {
            Payload::Log(event) => Some(event),
            _ => None,
        })
        .collect();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|event| event.kind == LogKind::QueueUnderflow && event.level == LogLevel::Critical));
}

#[test]
fn test_chat_spawns_join_the_live_registry() {
    let mut chat = ChatConfig {
        schedule: no_pause(5),
        spawn_probability: 1.0,
        initial_users: vec!["Chris".into()],
        ..ChatConfig::default()
    };
    chat.spawn_names = vec!["Ann".into()];
    let bus = ChannelRegistry::new();
    let notices = record(&bus, &[LOGON_NOTICE]);
    let mut scheduler = Scheduler::new(
        chat.schedule.clone(),
        bus,
        SharedRng::seeded(8),
        ChatScenario::new(chat),
    )
    .unwrap();

    scheduler.step().unwrap();
    scheduler.step().unwrap();
    let names: Vec<&str> = scheduler
        .simulation()
        .actors()
        .iter()
        .map(|actor| actor.name.as_str())
        .collect();
    assert_eq!(names, vec!["Chris", "Ann", "Ann"]);
    assert_eq!(scheduler.simulation().active_actors(scheduler.bus()), 3);
    assert_eq!(notices.texts().len(), 3);
}

async fn run_chat(seed: u64, answers: Vec<bool>) -> (Vec<Message>, u64) {
    let chat = ChatConfig {
        schedule: no_pause(30),
        spawn_probability: 0.2,
        ..ChatConfig::default()
    };
    let bus = ChannelRegistry::new();
    let transcript = record(&bus, &[CHAT, LOGON_NOTICE]);
    let mut scheduler = Scheduler::new(
        chat.schedule.clone(),
        bus,
        SharedRng::seeded(seed),
        ChatScenario::new(chat),
    )
    .unwrap();
    let summary = scheduler
        .run(&mut ScriptedOperator::new(answers))
        .await
        .unwrap();
    (transcript.messages(), summary.ticks)
}

#[tokio::test]
async fn test_same_seed_same_messages() {
    let (first, first_ticks) = run_chat(2024, vec![true, true]).await;
    let (second, second_ticks) = run_chat(2024, vec![true, true]).await;

    assert_eq!(first_ticks, 90);
    assert_eq!(first_ticks, second_ticks);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_server_run_completes_sessions() {
    let config = ServerConfig {
        schedule: no_pause(40),
        ..ServerConfig::default()
    };
    let bus = ChannelRegistry::new();
    let ticks = count_ticks(&bus);
    let mut scheduler = Scheduler::new(
        config.schedule.clone(),
        bus,
        SharedRng::seeded(77),
        ServerScenario::new(config),
    )
    .unwrap();

    let summary = scheduler.run(&mut SessionLimit::new(1)).await.unwrap();
    assert_eq!(summary.sessions, 2);
    assert_eq!(summary.ticks, 80);
    assert_eq!(ticks.load(Ordering::Relaxed), 80);
}
