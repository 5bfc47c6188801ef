//! Flight/ground configuration and duty-cycle tuning.
//!
//! The variant is read once at startup and decides which collaborators get
//! constructed: the ground configuration carries a debug channel and an LED
//! indicator sequence, the flight configuration arms the crash flag instead.

use core::fmt;
use core::time::Duration;

use crate::lifecycle::timing::{
    INDICATOR_BLINKS, INDICATOR_HALF_PERIOD, MODEM_POLL_INTERVAL, SENSOR_SETTLE, SLEEP_DURATION,
    TRANSMIT_DURATION,
};

/// Build configuration selecting flight or ground behaviour.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuildVariant {
    Flight,
    Ground,
}

impl BuildVariant {
    /// Parses a variant tag (`flight` / `ground`, case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownVariant`] for any other tag.
    pub fn from_tag(tag: &str) -> Result<Self, ConfigError> {
        if tag.eq_ignore_ascii_case("flight") {
            Ok(Self::Flight)
        } else if tag.eq_ignore_ascii_case("ground") {
            Ok(Self::Ground)
        } else {
            Err(ConfigError::UnknownVariant)
        }
    }

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            BuildVariant::Flight => "flight",
            BuildVariant::Ground => "ground",
        }
    }

    /// Crash-flag detection and arming runs only in flight.
    #[must_use]
    pub const fn handles_crash_flag(self) -> bool {
        matches!(self, BuildVariant::Flight)
    }

    /// The ground link exists only on the bench.
    #[must_use]
    pub const fn has_debug_channel(self) -> bool {
        matches!(self, BuildVariant::Ground)
    }

    /// LED sequence shown at boot, if any.
    #[must_use]
    pub const fn indicator_pattern(self) -> Option<IndicatorPattern> {
        match self {
            BuildVariant::Flight => None,
            BuildVariant::Ground => Some(IndicatorPattern::new(INDICATOR_BLINKS, INDICATOR_HALF_PERIOD)),
        }
    }
}

/// Status LED blink sequence: `blinks` on/off pairs, each half lasting `half_period`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IndicatorPattern {
    pub blinks: u8,
    pub half_period: Duration,
}

impl IndicatorPattern {
    #[must_use]
    pub const fn new(blinks: u8, half_period: Duration) -> Self {
        Self {
            blinks,
            half_period,
        }
    }

    /// Total time the sequence occupies.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.half_period * 2 * u32::from(self.blinks)
    }
}

/// Fixed durations the runtime waits between ticks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DutyCycleTimings {
    /// Wait after sampling before the readings are considered settled.
    pub sensor_settle: Duration,
    /// Wait between modem readiness polls.
    pub modem_poll_interval: Duration,
    /// Nominal duration of one transmit/receive exchange.
    pub transmit_duration: Duration,
    /// Time spent asleep before the next cycle wakes the modem.
    pub sleep_duration: Duration,
}

impl DutyCycleTimings {
    #[must_use]
    pub const fn flight_defaults() -> Self {
        Self {
            sensor_settle: SENSOR_SETTLE,
            modem_poll_interval: MODEM_POLL_INTERVAL,
            transmit_duration: TRANSMIT_DURATION,
            sleep_duration: SLEEP_DURATION,
        }
    }
}

impl Default for DutyCycleTimings {
    fn default() -> Self {
        Self::flight_defaults()
    }
}

/// Bound on how long AcquireAndSample may wait for the modem.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AcquisitionLimit {
    /// Poll forever.
    #[default]
    Unbounded,
    /// Give up after this many unsuccessful modem polls in one cycle.
    Attempts(u32),
    /// Give up once this much time has passed since the modem was woken.
    Timeout(Duration),
}

impl AcquisitionLimit {
    /// Returns `true` when `attempts` polls over `elapsed` exhaust the bound.
    #[must_use]
    pub fn is_exceeded(self, attempts: u32, elapsed: Duration) -> bool {
        match self {
            AcquisitionLimit::Unbounded => false,
            AcquisitionLimit::Attempts(limit) => attempts >= limit,
            AcquisitionLimit::Timeout(limit) => elapsed >= limit,
        }
    }
}

/// Complete configuration handed to the boot sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FlightConfig {
    pub variant: BuildVariant,
    pub timings: DutyCycleTimings,
    pub acquisition_limit: AcquisitionLimit,
}

impl FlightConfig {
    /// Default timings with unbounded modem acquisition.
    #[must_use]
    pub const fn for_variant(variant: BuildVariant) -> Self {
        Self {
            variant,
            timings: DutyCycleTimings::flight_defaults(),
            acquisition_limit: AcquisitionLimit::Unbounded,
        }
    }

    #[must_use]
    pub const fn with_timings(mut self, timings: DutyCycleTimings) -> Self {
        self.timings = timings;
        self
    }

    #[must_use]
    pub const fn with_acquisition_limit(mut self, limit: AcquisitionLimit) -> Self {
        self.acquisition_limit = limit;
        self
    }

    /// Rejects settings that would spin the tick loop or never allow a poll.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroPollInterval`] or [`ConfigError::ZeroAcquisitionBound`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timings.modem_poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        match self.acquisition_limit {
            AcquisitionLimit::Attempts(0) => Err(ConfigError::ZeroAcquisitionBound),
            AcquisitionLimit::Timeout(limit) if limit.is_zero() => {
                Err(ConfigError::ZeroAcquisitionBound)
            }
            _ => Ok(()),
        }
    }
}

/// Errors raised while building or validating a [`FlightConfig`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    UnknownVariant,
    ZeroPollInterval,
    ZeroAcquisitionBound,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownVariant => f.write_str("unknown build variant (expected flight or ground)"),
            ConfigError::ZeroPollInterval => f.write_str("modem poll interval must be non-zero"),
            ConfigError::ZeroAcquisitionBound => {
                f.write_str("acquisition bound must allow at least one poll")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_tags_parse_case_insensitively() {
        assert_eq!(BuildVariant::from_tag("FLIGHT"), Ok(BuildVariant::Flight));
        assert_eq!(BuildVariant::from_tag("ground"), Ok(BuildVariant::Ground));
        assert_eq!(
            BuildVariant::from_tag("orbit"),
            Err(ConfigError::UnknownVariant)
        );
    }

    #[test]
    fn variant_selects_collaborators() {
        assert!(BuildVariant::Flight.handles_crash_flag());
        assert!(!BuildVariant::Flight.has_debug_channel());
        assert!(BuildVariant::Flight.indicator_pattern().is_none());

        assert!(!BuildVariant::Ground.handles_crash_flag());
        assert!(BuildVariant::Ground.has_debug_channel());
        let pattern = BuildVariant::Ground
            .indicator_pattern()
            .expect("ground shows the indicator");
        assert_eq!(pattern.blinks, 5);
        assert_eq!(pattern.total_duration(), Duration::from_millis(1_500));
    }

    #[test]
    fn acquisition_limits_trip_at_their_bound() {
        let elapsed = Duration::from_secs(5);
        assert!(!AcquisitionLimit::Unbounded.is_exceeded(u32::MAX, Duration::MAX));
        assert!(!AcquisitionLimit::Attempts(3).is_exceeded(2, elapsed));
        assert!(AcquisitionLimit::Attempts(3).is_exceeded(3, elapsed));
        assert!(!AcquisitionLimit::Timeout(Duration::from_secs(6)).is_exceeded(0, elapsed));
        assert!(AcquisitionLimit::Timeout(Duration::from_secs(5)).is_exceeded(0, elapsed));
    }

    #[test]
    fn validate_rejects_degenerate_settings() {
        let config = FlightConfig::for_variant(BuildVariant::Flight);
        assert_eq!(config.validate(), Ok(()));

        let mut timings = DutyCycleTimings::flight_defaults();
        timings.modem_poll_interval = Duration::ZERO;
        assert_eq!(
            config.with_timings(timings).validate(),
            Err(ConfigError::ZeroPollInterval)
        );

        assert_eq!(
            config
                .with_acquisition_limit(AcquisitionLimit::Attempts(0))
                .validate(),
            Err(ConfigError::ZeroAcquisitionBound)
        );
        assert_eq!(
            config
                .with_acquisition_limit(AcquisitionLimit::Timeout(Duration::ZERO))
                .validate(),
            Err(ConfigError::ZeroAcquisitionBound)
        );
    }
}
