/*!
 * Adaptive Backoff
 *
 * Three-phase waiting for polling loops:
 *
 * 1. **Tight spin phase** (0-10 iterations): `spin_loop()` hint
 * 2. **Yield phase** (10-50 iterations): `yield_now()` every iteration
 * 3. **Sleep phase** (50+ iterations): exponentially increasing sleep, capped at 1ms
 *
 * The spin and yield phases are skipped once the configured spin budget
 * (duration or iteration count) is spent.
 */

use crate::core::config::WaitConfig;
use crate::core::limits::WAIT_MAX_BACKOFF;
use std::thread;
use std::time::{Duration, Instant};

const SPIN_PHASE: u32 = 10;
const YIELD_PHASE: u32 = 50;

/// Backoff state for a single wait
#[derive(Debug)]
pub struct Backoff {
    started: Instant,
    spin_duration: Duration,
    max_spins: u32,
    step: u32,
    sleep_ns: u64,
}

impl Backoff {
    pub fn new(config: &WaitConfig) -> Self {
        Self {
            started: Instant::now(),
            spin_duration: config.spin_duration(),
            max_spins: config.max_spins,
            step: 0,
            sleep_ns: 1,
        }
    }

    /// True while the waiter is still burning CPU rather than sleeping
    pub fn is_spinning(&self) -> bool {
        self.step < YIELD_PHASE
            && self.step < self.max_spins
            && self.started.elapsed() < self.spin_duration
    }

    /// Wait one step
    pub fn snooze(&mut self) {
        if self.is_spinning() {
            if self.step < SPIN_PHASE {
                std::hint::spin_loop();
            } else {
                thread::yield_now();
            }
        } else {
            thread::sleep(Duration::from_nanos(self.sleep_ns));
            self.sleep_ns = (self.sleep_ns * 2).min(WAIT_MAX_BACKOFF.as_nanos() as u64);
        }
        self.step = self.step.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.started = Instant::now();
        self.step = 0;
        self.sleep_ns = 1;
    }
}

/// Repeatedly evaluate `check` with backoff until it returns true or `timeout` elapses
///
/// `check` is always evaluated at least once. Returns the final outcome.
pub fn wait_until(config: &WaitConfig, timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    let mut backoff = Backoff::new(config);

    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        backoff.snooze();
    }
}
