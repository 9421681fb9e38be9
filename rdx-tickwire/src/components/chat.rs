//! A simulated chat room.
//!
//! Each `ChatUser` is an actor that logs on, greets newcomers, chats at
//! random intervals, and logs off after a while. `ChatScenario` seeds the
//! room and lets new users wander in.

use crate::bus::{ChannelRegistry, DispatchContext, Subscriber};
use crate::common::{SubscriberId, CHAT, LOGON, LOGON_NOTICE, TICK};
use crate::config::ChatConfig;
use crate::engine::{Scenario, World};
use crate::events::{Message, Payload};
use crate::random::SharedRng;
use tracing::debug;

const OPENING_LINES: &[&str] = &[
    "Hello, how is everyone?",
    "Hey guys, how's it going?",
    "Yoooooo",
    "hey people",
    "Did you hear what happened to Jim?",
];

const CHATTER_LINES: &[&str] = &[
    "cool, cool",
    "I did hear about it. And it is crazy.",
    "Did any one see that movie I recommended last time?",
    "no",
    "Nope",
    "nah",
    "yep",
    "yeah",
    "Dude, I finally beat that damn boss.",
    "nice",
    "congrats",
    "Nice day today.",
    "Did you ever find that book I lent you?",
    "and...",
];

const CLOSING_LINES: &[&str] = &[
    "I gotta go, talk to you later.",
    "later guys",
    "Alright, I'm out",
    "I'll be on later.",
];

const GREETINGS: &[&str] = &["hey", "howdy", "ayyy, sup"];

/// Which table a user's next line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Opening,
    Chatter,
    Closing,
}

impl ChatPhase {
    /// The phase for a user who has already sent `sent` messages.
    pub fn for_count(sent: u32, farewell_after: u32) -> Self {
        if sent == 0 {
            ChatPhase::Opening
        } else if sent > farewell_after {
            ChatPhase::Closing
        } else {
            ChatPhase::Chatter
        }
    }

    fn lines(self) -> &'static [&'static str] {
        match self {
            ChatPhase::Opening => OPENING_LINES,
            ChatPhase::Chatter => CHATTER_LINES,
            ChatPhase::Closing => CLOSING_LINES,
        }
    }
}

/// A simulated chat participant.
pub struct ChatUser {
    name: String,
    rng: SharedRng,
    countdown: u32,
    sent: u32,
    countdown_max: u32,
    farewell_after: u32,
}

impl ChatUser {
    /// Creates a user and logs it on.
    ///
    /// The user is subscribed to `tick`, announces itself on `logon_notice`,
    /// tells everyone already present on `logon`, and only then subscribes to
    /// `logon` itself.
    pub fn join(
        bus: &ChannelRegistry,
        rng: &SharedRng,
        name: &str,
        config: &ChatConfig,
    ) -> SubscriberId {
        let user = ChatUser {
            name: name.to_string(),
            rng: rng.clone(),
            countdown: rng.range_inclusive(1, config.first_countdown_max),
            sent: 0,
            countdown_max: config.countdown_max,
            farewell_after: config.farewell_after,
        };
        let id = bus.register(user);
        bus.subscribe(TICK, id);
        bus.publish(
            LOGON_NOTICE,
            Payload::Text(format!("{} HAS LOGGED ON.", name.to_uppercase())),
        );
        bus.publish(
            LOGON,
            Payload::Join {
                name: name.to_string(),
            },
        );
        bus.subscribe(LOGON, id);
        id
    }

    fn say(&self, bus: &ChannelRegistry, text: &str) {
        bus.publish(CHAT, Payload::Text(format!("{}: {}", self.name, text)));
    }

    fn on_tick(&mut self, ctx: &DispatchContext<'_>) {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return;
        }

        let phase = ChatPhase::for_count(self.sent, self.farewell_after);
        let line = self.rng.pick(phase.lines()).copied().unwrap_or_default();
        self.say(ctx.bus, line);
        self.sent += 1;

        if phase == ChatPhase::Closing {
            ctx.bus.publish(
                CHAT,
                Payload::Text(format!("{} HAS LOGGED OFF.", self.name.to_uppercase())),
            );
            let channels = ctx.unsubscribe_self();
            debug!(name = %self.name, sent = self.sent, channels, "user logged off");
        } else {
            self.countdown = self.rng.range_inclusive(1, self.countdown_max);
        }
    }

    fn on_join(&self, ctx: &DispatchContext<'_>, newcomer: &str) {
        let greeting = self.rng.pick(GREETINGS).copied().unwrap_or("hey");
        self.say(ctx.bus, &format!("{greeting} {newcomer}"));
    }
}

impl Subscriber for ChatUser {
    fn label(&self) -> &str {
        &self.name
    }

    fn handle(&mut self, ctx: &DispatchContext<'_>, message: &Message) -> anyhow::Result<()> {
        match &message.payload {
            Payload::Tick(_) => self.on_tick(ctx),
            Payload::Join { name } => self.on_join(ctx, name),
            _ => {}
        }
        Ok(())
    }
}

/// The chat room world: a few initial users, and random newcomers.
pub struct ChatScenario {
    config: ChatConfig,
}

impl ChatScenario {
    pub fn new(config: ChatConfig) -> Self {
        Self { config }
    }

    fn spawn(&self, world: &mut World<'_>, name: &str) {
        let id = ChatUser::join(world.bus, world.rng, name, &self.config);
        world.enlist(id, name);
    }
}

impl Scenario for ChatScenario {
    fn label(&self) -> &str {
        "chat"
    }

    fn populate(&mut self, world: &mut World<'_>) -> anyhow::Result<()> {
        for name in &self.config.initial_users {
            self.spawn(world, name);
        }
        Ok(())
    }

    fn world_events(&mut self, world: &mut World<'_>) {
        if world.rng.chance(self.config.spawn_probability) {
            if let Some(name) = world.rng.pick(&self.config.spawn_names) {
                self.spawn(world, name);
            }
        }
    }
}
