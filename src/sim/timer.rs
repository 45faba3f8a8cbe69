//! Tick-driven countdowns
//!
//! Every timer in the simulation is a plain field advanced by the scheduler,
//! never a host callback. Pausing is therefore just "don't advance": elapsed
//! progress is kept exactly as it was.

use serde::{Deserialize, Serialize};

/// Idle (already fired) by default
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Countdown {
    pub remaining: f32,
    pub duration: f32,
}

impl Countdown {
    pub fn new(duration: f32) -> Self {
        Self {
            remaining: duration,
            duration,
        }
    }

    /// Advance by `dt`; returns true on the tick the countdown reaches zero.
    /// A fired countdown stays at zero until restarted.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            return true;
        }
        false
    }

    /// Start over with a (possibly different) duration
    pub fn restart(&mut self, duration: f32) {
        self.duration = duration;
        self.remaining = duration;
    }

    pub fn is_done(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Fraction elapsed, 0 at start and 1 when done
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            1.0 - self.remaining / self.duration
        }
    }
}

/// One line of `World::timer_report`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerEntry {
    pub label: String,
    pub remaining: f32,
}
