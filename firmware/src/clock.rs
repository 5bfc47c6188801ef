//! Embassy-backed instant for the flight controller.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::ops::Add;
use core::time::Duration;

use embassy_time::{Duration as EmbassyDuration, Instant as EmbassyInstant};
use flight_core::clock::MonotonicInstant;

/// Monotonic instant wrapping the embassy time driver tick counter.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(EmbassyInstant);

impl FirmwareInstant {
    /// Reads the time driver. Only valid on target, where a driver is linked.
    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self(EmbassyInstant::now())
    }

    pub const fn into_embassy(self) -> EmbassyInstant {
        self.0
    }

    pub fn as_micros(self) -> u64 {
        self.0.as_micros()
    }
}

impl From<EmbassyInstant> for FirmwareInstant {
    fn from(value: EmbassyInstant) -> Self {
        Self(value)
    }
}

impl Add<Duration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + to_embassy(rhs))
    }
}

impl MonotonicInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        let micros = self.0.as_micros().saturating_sub(earlier.0.as_micros());
        Duration::from_micros(micros)
    }
}

/// Converts a core duration into embassy ticks, saturating on overflow.
pub fn to_embassy(duration: Duration) -> EmbassyDuration {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    EmbassyDuration::from_micros(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(micros: u64) -> FirmwareInstant {
        FirmwareInstant::from(EmbassyInstant::from_micros(micros))
    }

    #[test]
    fn adding_durations_advances_the_instant() {
        let later = at(1_000) + Duration::from_millis(500);
        assert_eq!(later.as_micros(), 501_000);
        assert!(later > at(1_000));
    }

    #[test]
    fn duration_since_saturates_at_zero() {
        assert_eq!(
            at(5_000).saturating_duration_since(at(2_000)),
            Duration::from_micros(3_000)
        );
        assert_eq!(at(2_000).saturating_duration_since(at(5_000)), Duration::ZERO);
    }

    #[test]
    fn long_waits_convert_without_truncation() {
        assert_eq!(to_embassy(Duration::from_secs(30)).as_millis(), 30_000);
    }
}
