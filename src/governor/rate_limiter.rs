// Fixed-window call budget for the scoring oracle.
//
// The oracle is billed per call, so calls are capped at N per window
// (60 seconds by default). The budget refills all at once when the window
// rolls over. Unlike a sleeping limiter, an empty budget is reported back
// to the caller immediately: moderation must never stall a message while
// it waits for quota.

use std::time::{Duration, Instant};

/// Call budget for one window. Not thread-safe on its own; the governor
/// owns it behind its state mutex.
#[derive(Debug)]
pub struct RateBudget {
    /// Calls allowed per window.
    capacity: u32,
    /// Calls left in the current window.
    remaining: u32,
    /// Length of one window.
    window: Duration,
    /// When the current window opened.
    window_start: Instant,
}

impl RateBudget {
    /// A full budget whose first window opens at `now`.
    pub fn new(capacity: u32, window: Duration, now: Instant) -> Self {
        Self {
            capacity,
            remaining: capacity,
            window,
            window_start: now,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Refill if the window has elapsed. Returns true when a new window opened.
    fn roll(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.window_start) >= self.window {
            self.window_start = now;
            self.remaining = self.capacity;
            true
        } else {
            false
        }
    }

    /// Take one call from the budget. Returns false when the current
    /// window is spent.
    pub fn try_take(&mut self, now: Instant) -> bool {
        self.roll(now);
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Calls left in the window that is current at `now`.
    pub fn remaining(&mut self, now: Instant) -> u32 {
        self.roll(now);
        self.remaining
    }

    /// Time until the current window refills.
    pub fn resets_in(&self, now: Instant) -> Duration {
        (self.window_start + self.window).saturating_duration_since(now)
    }

    /// Start of the current window. Used to log exhaustion once per window.
    pub fn window_start(&self) -> Instant {
        self.window_start
    }
}
