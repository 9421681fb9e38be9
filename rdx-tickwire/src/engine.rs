//! The scheduler that drives the whole Tickwire timeline.

use crate::bus::ChannelRegistry;
use crate::common::{SubscriberId, SYSTEM, TICK};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::events::{Payload, SystemEvent, TickEvent};
use crate::operator::{CheckpointPrompt, Operator};
use crate::random::SharedRng;
use tracing::{debug, info, trace};

/// The states of the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Publishing ticks.
    Running,
    /// The tick budget is spent; waiting for the operator.
    AwaitingContinue,
    /// Terminal. No further ticks are published.
    Stopped,
}

/// An actor the simulation has spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorEntry {
    pub id: SubscriberId,
    pub name: String,
}

/// The mutable record shared by one run.
///
/// `ticks_remaining` is only changed by the scheduler; the actor list only by
/// spawn logic going through `World::enlist`.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    ticks_remaining: u32,
    tick: u64,
    sessions: u32,
    actors: Vec<ActorEntry>,
}

impl SimulationState {
    pub fn ticks_remaining(&self) -> u32 {
        self.ticks_remaining
    }

    /// The number of ticks published so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Sessions started, including the first.
    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    /// Every actor ever spawned, in spawn order, including retired ones.
    pub fn actors(&self) -> &[ActorEntry] {
        &self.actors
    }

    /// Actors that are still registered with `bus`.
    pub fn active_actors(&self, bus: &ChannelRegistry) -> usize {
        self.actors
            .iter()
            .filter(|actor| bus.is_registered(actor.id))
            .count()
    }
}

/// What a scenario can touch while setting up or rolling world events.
pub struct World<'a> {
    pub bus: &'a ChannelRegistry,
    pub rng: &'a SharedRng,
    state: &'a mut SimulationState,
}

impl World<'_> {
    /// Records a freshly spawned actor in the live registry.
    pub fn enlist(&mut self, id: SubscriberId, name: impl Into<String>) {
        let name = name.into();
        debug!(?id, %name, tick = self.state.tick, "actor enlisted");
        self.state.actors.push(ActorEntry { id, name });
    }

    pub fn state(&self) -> &SimulationState {
        &*self.state
    }
}

/// The rules of one simulated world.
pub trait Scenario {
    /// A short name used in logs and at the checkpoint.
    fn label(&self) -> &str;

    /// Spawns the initial actors. Called once, before the first tick.
    fn populate(&mut self, world: &mut World<'_>) -> anyhow::Result<()>;

    /// Rolls this tick's world events, after the tick has been dispatched.
    ///
    /// Independent Bernoulli trials must be evaluated in a fixed order so
    /// that a seeded run is reproducible.
    fn world_events(&mut self, world: &mut World<'_>);
}

/// Totals for a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub sessions: u32,
}

/// The cooperative tick loop.
///
/// Each `Running` iteration publishes a tick, rolls the scenario's world
/// events, and spends one tick of the budget. When the budget reaches zero the
/// scheduler moves to `AwaitingContinue`; the operator's answer either refills
/// the budget or stops the scheduler for good.
pub struct Scheduler {
    config: SchedulerConfig,
    bus: ChannelRegistry,
    rng: SharedRng,
    scenario: Box<dyn Scenario>,
    state: SimulationState,
    phase: SchedulerState,
}

impl Scheduler {
    /// Creates a scheduler and lets `scenario` populate the world.
    ///
    /// Publishes `SystemEvent::SessionStarted` once setup is done.
    pub fn new(
        config: SchedulerConfig,
        bus: ChannelRegistry,
        rng: SharedRng,
        scenario: impl Scenario + 'static,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let mut scheduler = Self {
            state: SimulationState {
                ticks_remaining: config.ticks_per_session,
                sessions: 1,
                ..Default::default()
            },
            config,
            bus,
            rng,
            scenario: Box::new(scenario),
            phase: SchedulerState::Running,
        };

        let mut world = World {
            bus: &scheduler.bus,
            rng: &scheduler.rng,
            state: &mut scheduler.state,
        };
        scheduler
            .scenario
            .populate(&mut world)
            .map_err(SchedulerError::Setup)?;

        info!(
            scenario = scheduler.scenario.label(),
            ticks = scheduler.config.ticks_per_session,
            actors = scheduler.state.actors.len(),
            "scheduler ready"
        );
        scheduler.bus.publish(
            SYSTEM,
            Payload::System(SystemEvent::SessionStarted {
                ticks: scheduler.config.ticks_per_session,
            }),
        );
        Ok(scheduler)
    }

    pub fn state(&self) -> SchedulerState {
        self.phase
    }

    pub fn simulation(&self) -> &SimulationState {
        &self.state
    }

    pub fn bus(&self) -> &ChannelRegistry {
        &self.bus
    }

    fn expect(&self, expected: SchedulerState) -> Result<(), SchedulerError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SchedulerError::InvalidState {
                expected,
                actual: self.phase,
            })
        }
    }

    /// Runs one `Running` iteration without pacing.
    pub fn step(&mut self) -> Result<SchedulerState, SchedulerError> {
        self.expect(SchedulerState::Running)?;

        self.state.tick += 1;
        let tick = TickEvent {
            tick: self.state.tick,
            ticks_remaining: self.state.ticks_remaining,
            active_actors: self.state.active_actors(&self.bus),
        };
        let report = self.bus.publish(TICK, Payload::Tick(tick));
        trace!(
            tick = tick.tick,
            remaining = tick.ticks_remaining,
            delivered = report.delivered,
            failed = report.failures.len(),
            "tick dispatched"
        );

        let mut world = World {
            bus: &self.bus,
            rng: &self.rng,
            state: &mut self.state,
        };
        self.scenario.world_events(&mut world);

        self.state.ticks_remaining = self.state.ticks_remaining.saturating_sub(1);
        if self.state.ticks_remaining == 0 {
            self.phase = SchedulerState::AwaitingContinue;
            info!(tick = self.state.tick, "tick budget spent; awaiting operator");
            self.bus.publish(
                SYSTEM,
                Payload::System(SystemEvent::Paused {
                    tick: self.state.tick,
                }),
            );
        }
        Ok(self.phase)
    }

    /// Asks `operator` whether to continue and applies the answer.
    pub fn resolve_checkpoint(
        &mut self,
        operator: &mut dyn Operator,
    ) -> Result<SchedulerState, SchedulerError> {
        self.expect(SchedulerState::AwaitingContinue)?;

        let prompt = CheckpointPrompt {
            scenario: self.scenario.label().to_string(),
            tick: self.state.tick,
            refill: self.config.ticks_per_session,
            tick_interval: self.config.tick_interval(),
        };
        if operator.confirm_continue(&prompt) {
            self.state.ticks_remaining = self.config.ticks_per_session;
            self.state.sessions += 1;
            self.phase = SchedulerState::Running;
            info!(session = self.state.sessions, "operator chose to continue");
            self.bus.publish(
                SYSTEM,
                Payload::System(SystemEvent::Resumed {
                    ticks: self.config.ticks_per_session,
                }),
            );
        } else {
            self.phase = SchedulerState::Stopped;
            info!(tick = self.state.tick, "operator stopped the simulation");
            self.bus.publish(
                SYSTEM,
                Payload::System(SystemEvent::Stopped {
                    tick: self.state.tick,
                }),
            );
        }
        Ok(self.phase)
    }

    /// Drives the loop until the operator stops it.
    ///
    /// The pause between ticks is the only timed suspension; the checkpoint
    /// blocks on the operator for as long as it takes.
    pub async fn run(&mut self, operator: &mut dyn Operator) -> Result<RunSummary, SchedulerError> {
        loop {
            match self.phase {
                SchedulerState::Running => {
                    if self.step()? == SchedulerState::Running {
                        self.pace().await;
                    }
                }
                SchedulerState::AwaitingContinue => {
                    self.resolve_checkpoint(operator)?;
                }
                SchedulerState::Stopped => break,
            }
        }
        Ok(RunSummary {
            ticks: self.state.tick,
            sessions: self.state.sessions,
        })
    }

    async fn pace(&self) {
        let interval = self.config.tick_interval();
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DispatchContext;
    use crate::events::Message;
    use crate::operator::ScriptedOperator;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Empty;

    impl Scenario for Empty {
        fn label(&self) -> &str {
            "empty"
        }

        fn populate(&mut self, _world: &mut World<'_>) -> anyhow::Result<()> {
            Ok(())
        }

        fn world_events(&mut self, _world: &mut World<'_>) {}
    }

    fn config(ticks: u32) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval_ms: 0,
            ticks_per_session: ticks,
        }
    }

    #[test]
    fn test_counts_down_to_checkpoint() {
        let bus = ChannelRegistry::new();
        let mut scheduler = Scheduler::new(config(3), bus, SharedRng::seeded(0), Empty).unwrap();

        assert_eq!(scheduler.step().unwrap(), SchedulerState::Running);
        assert_eq!(scheduler.simulation().ticks_remaining(), 2);
        assert_eq!(scheduler.step().unwrap(), SchedulerState::Running);
        assert_eq!(scheduler.step().unwrap(), SchedulerState::AwaitingContinue);
        assert_eq!(scheduler.simulation().ticks_remaining(), 0);

        let err = scheduler.step().unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidState { .. }));
        assert_eq!(scheduler.simulation().tick(), 3);
    }

    #[test]
    fn test_continue_refills_budget() {
        let bus = ChannelRegistry::new();
        let mut scheduler = Scheduler::new(config(1), bus, SharedRng::seeded(0), Empty).unwrap();
        scheduler.step().unwrap();

        let mut operator = ScriptedOperator::new([true]);
        assert_eq!(
            scheduler.resolve_checkpoint(&mut operator).unwrap(),
            SchedulerState::Running
        );
        assert_eq!(scheduler.simulation().ticks_remaining(), 1);
        assert_eq!(scheduler.simulation().sessions(), 2);
    }

    #[test]
    fn test_rejects_empty_budget() {
        let result = Scheduler::new(config(0), ChannelRegistry::new(), SharedRng::seeded(0), Empty);
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }

    #[test]
    fn test_tick_payload_carries_budget() {
        let bus = ChannelRegistry::new();
        let seen = Arc::new(AtomicU32::new(u32::MAX));
        let seen_clone = Arc::clone(&seen);
        let probe = bus.register_fn("probe", move |_: &DispatchContext<'_>, message: &Message| {
            if let Payload::Tick(tick) = message.payload {
                seen_clone.store(tick.ticks_remaining, Ordering::Relaxed);
            }
            Ok(())
        });
        bus.subscribe(TICK, probe);

        let mut scheduler = Scheduler::new(config(5), bus, SharedRng::seeded(0), Empty).unwrap();
        scheduler.step().unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_run_until_stopped() {
        let bus = ChannelRegistry::new();
        let mut scheduler = Scheduler::new(config(4), bus, SharedRng::seeded(0), Empty).unwrap();
        let mut operator = ScriptedOperator::new([true, true, false]);

        let summary = scheduler.run(&mut operator).await.unwrap();
        assert_eq!(summary, RunSummary { ticks: 12, sessions: 3 });
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(operator.asked(), 3);
    }
}
