//! Monotonic time abstraction shared by firmware and host targets.
//!
//! The lifecycle controller never reads a clock itself. Callers pass the
//! current instant into every tick, which keeps the duty cycle deterministic
//! under test and lets the firmware and emulator supply their own time bases.

use core::ops::Add;
use core::time::Duration;

/// Monotonic timestamp type accepted by the lifecycle controller.
pub trait MonotonicInstant: Copy + Ord + Add<Duration, Output = Self> {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Returns the time left until `deadline`, or `None` once it has passed.
#[must_use]
pub fn remaining_until<I: MonotonicInstant>(now: I, deadline: I) -> Option<Duration> {
    if now >= deadline {
        None
    } else {
        Some(deadline.saturating_duration_since(now))
    }
}
