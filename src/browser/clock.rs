use std::cell::RefCell;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Source of settle delays between interaction steps.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested sleeps without waiting.
#[derive(Debug, Default)]
pub struct RecordingClock {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Clock for RecordingClock {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

// ============================================================================
// Timing
// ============================================================================

/// Delays, in milliseconds, between steps of widget interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub open_settle_ms: u64,
    pub pointer_gap_ms: u64,
    pub click_gap_ms: u64,
    pub select_settle_ms: u64,
    pub typing_settle_ms: u64,
    pub key_gap_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            open_settle_ms: 600,
            pointer_gap_ms: 100,
            click_gap_ms: 50,
            select_settle_ms: 300,
            typing_settle_ms: 400,
            key_gap_ms: 100,
        }
    }
}

impl Timing {
    /// No delays at all.
    pub fn instant() -> Self {
        Timing {
            open_settle_ms: 0,
            pointer_gap_ms: 0,
            click_gap_ms: 0,
            select_settle_ms: 0,
            typing_settle_ms: 0,
            key_gap_ms: 0,
        }
    }
}

/// A clock paired with the delays to apply.
#[derive(Clone, Copy)]
pub struct Pacer<'a> {
    clock: &'a dyn Clock,
    timing: Timing,
}

impl<'a> Pacer<'a> {
    pub fn new(clock: &'a dyn Clock, timing: Timing) -> Self {
        Pacer { clock, timing }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    fn wait(&self, ms: u64) {
        if ms > 0 {
            self.clock.sleep(Duration::from_millis(ms));
        }
    }

    pub fn after_open(&self) {
        self.wait(self.timing.open_settle_ms);
    }

    pub fn between_pointer_events(&self) {
        self.wait(self.timing.pointer_gap_ms);
    }

    pub fn between_clicks(&self) {
        self.wait(self.timing.click_gap_ms);
    }

    pub fn after_select(&self) {
        self.wait(self.timing.select_settle_ms);
    }

    pub fn after_typing(&self) {
        self.wait(self.timing.typing_settle_ms);
    }

    pub fn between_keys(&self) {
        self.wait(self.timing.key_gap_ms);
    }
}
