//! Random number sources for the cache and the weighted selectors.
//!
//! Every component that draws randomly takes an `Arc<dyn RandomSource>`
//! instead of reaching for a global generator. This keeps draws injectable:
//! production code uses [`ThreadRandom`], tests script exact draws with
//! [`SequenceRandom`].
//!
//! None of these generators are suitable for anything security related.

use std::cell::Cell;
use std::collections::VecDeque;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;

/// Source of uniformly distributed integers.
pub trait RandomSource: Send + Sync {
    /// Draw an integer in `[min, max)`.
    ///
    /// Returns `min` when the range is empty (`max <= min`).
    fn next(&self, min: u64, max: u64) -> u64;

    /// Draw a position in `[0, len)` for indexing a non-empty slice.
    ///
    /// A draw outside the range (an implementation breaking the `next`
    /// contract) is clamped to the last position instead of panicking at
    /// the index site.
    fn index(&self, len: usize) -> usize {
        let last = len.saturating_sub(1);
        usize::try_from(self.next(0, len as u64))
            .unwrap_or(last)
            .min(last)
    }
}

/// Shared handle to the default per-thread generator.
pub fn default_source() -> Arc<dyn RandomSource> {
    Arc::new(ThreadRandom)
}

/// One xorshift64* step.
#[inline]
fn xorshift(state: u64) -> u64 {
    let mut x = state;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    x
}

#[inline]
fn scramble(state: u64) -> u64 {
    state.wrapping_mul(0x2545_F491_4F6C_DD1D)
}

/// Map a raw 64-bit value onto `[min, max)` by widening multiply.
#[inline]
fn project(raw: u64, min: u64, max: u64) -> u64 {
    if max <= min {
        return min;
    }
    let span = max - min;
    min + ((u128::from(raw) * u128::from(span)) >> 64) as u64
}

thread_local! {
    static THREAD_STATE: Cell<u64> = const { Cell::new(0) };
}

fn fresh_seed() -> u64 {
    let mut hasher = RandomState::new().build_hasher();
    std::thread::current().id().hash(&mut hasher);
    if let Ok(elapsed) = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
        elapsed.as_nanos().hash(&mut hasher);
    }
    // xorshift never leaves zero
    hasher.finish() | 1
}

/// Per-thread xorshift generator, lazily seeded on first use in each thread.
///
/// Zero-sized; all state lives in a thread local, so one handle can be
/// shared freely across threads without contention.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next(&self, min: u64, max: u64) -> u64 {
        let raw = THREAD_STATE.with(|cell| {
            let mut state = cell.get();
            if state == 0 {
                state = fresh_seed();
            }
            state = xorshift(state);
            cell.set(state);
            scramble(state)
        });
        project(raw, min, max)
    }
}

/// Deterministic xorshift generator with an explicit seed.
///
/// Reproducible across runs for the same sequence of calls.
#[derive(Debug)]
pub struct SeededRandom {
    state: AtomicU64,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            // Initialize with non-zero seed for xorshift
            state: AtomicU64::new(seed ^ 0x9E37_79B9_7F4A_7C15 | 1),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next(&self, min: u64, max: u64) -> u64 {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let next = xorshift(current);
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return project(scramble(next), min, max),
                Err(observed) => current = observed,
            }
        }
    }
}

/// Scripted source that replays a fixed list of draws, cycling when exhausted.
///
/// Values already inside `[min, max)` are returned verbatim; anything
/// outside is clamped into the range. Useful for pinning exact branches of
/// the weighted selectors in tests.
#[derive(Debug)]
pub struct SequenceRandom {
    values: Mutex<VecDeque<u64>>,
}

impl SequenceRandom {
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn next(&self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        let mut values = self.values.lock();
        let Some(value) = values.pop_front() else {
            return min;
        };
        values.push_back(value);
        value.clamp(min, max - 1)
    }
}
