//! Injectable randomness.
//!
//! Every random decision in the engine (spawn trials, countdowns, content
//! selection) is drawn from a `SharedRng`. Seed it to make a run reproducible.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};

/// A source of uniform random numbers.
///
/// Implemented for every `rand` generator; implement it directly to script
/// exact outcomes.
pub trait RandomSource: Send {
    /// Returns a float uniformly drawn from `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Returns an integer uniformly drawn from `[0, bound)`. Returns 0 when
    /// `bound` is 0.
    fn next_below(&mut self, bound: u32) -> u32;
}

impl<R: RngCore + Send> RandomSource for R {
    fn next_f64(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn next_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.gen_range(0..bound)
    }
}

/// A cloneable handle to one random source shared by the scheduler and
/// every actor of a run.
#[derive(Clone)]
pub struct SharedRng {
    source: Arc<Mutex<Box<dyn RandomSource>>>,
}

impl SharedRng {
    /// Wraps an arbitrary random source.
    pub fn new(source: impl RandomSource + 'static) -> Self {
        Self {
            source: Arc::new(Mutex::new(Box::new(source))),
        }
    }

    /// A deterministic source: the same seed yields the same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// A source seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Seeded when `seed` is given, entropy-seeded otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut dyn RandomSource) -> T) -> T {
        let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        f(source.as_mut())
    }

    /// A Bernoulli trial that succeeds with probability `p`.
    ///
    /// Always consumes exactly one draw, so the sequence of later draws does
    /// not depend on the probabilities configured.
    pub fn chance(&self, p: f64) -> bool {
        self.with(|source| source.next_f64()) < p
    }

    /// An integer uniformly drawn from `low..=high`.
    pub fn range_inclusive(&self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        low + self.with(|source| source.next_below(high - low + 1))
    }

    /// A uniformly chosen element of `items`, or `None` if it is empty.
    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        let len = u32::try_from(items.len()).unwrap_or(u32::MAX);
        if len == 0 {
            return None;
        }
        let index = self.with(|source| source.next_below(len));
        items.get(index as usize)
    }
}

impl std::fmt::Debug for SharedRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRng").finish_non_exhaustive()
    }
}
