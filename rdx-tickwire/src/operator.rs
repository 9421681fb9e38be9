//! The operator consulted when a session's tick budget runs out.

use std::collections::VecDeque;
use std::time::Duration;

/// Context shown to the operator at the continue checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointPrompt {
    /// Label of the running scenario.
    pub scenario: String,
    /// The last tick published.
    pub tick: u64,
    /// Ticks the next session would run for.
    pub refill: u32,
    /// Real time between ticks.
    pub tick_interval: Duration,
}

impl CheckpointPrompt {
    /// Approximate real time the next session would take.
    pub fn session_length(&self) -> Duration {
        self.tick_interval * self.refill
    }
}

/// Decides, at the end of each session, whether the simulation continues.
///
/// This call blocks the whole timeline; nothing else runs until it returns.
pub trait Operator {
    /// Returns `true` to run another session, `false` to stop.
    fn confirm_continue(&mut self, prompt: &CheckpointPrompt) -> bool;
}

/// Replays a fixed list of answers, then answers "no" forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<bool>,
    asked: usize,
}

impl ScriptedOperator {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: 0,
        }
    }

    /// How many times the checkpoint was reached.
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl Operator for ScriptedOperator {
    fn confirm_continue(&mut self, _prompt: &CheckpointPrompt) -> bool {
        self.asked += 1;
        self.answers.pop_front().unwrap_or(false)
    }
}

/// Continues for a fixed number of further sessions, then stops.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimit {
    remaining: u32,
}

impl SessionLimit {
    pub fn new(extra_sessions: u32) -> Self {
        Self {
            remaining: extra_sessions,
        }
    }
}

impl Operator for SessionLimit {
    fn confirm_continue(&mut self, _prompt: &CheckpointPrompt) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}
