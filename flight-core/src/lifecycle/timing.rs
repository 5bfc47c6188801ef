//! Duty-cycle timing constants.

use core::time::Duration;

/// Settling time after a sensor sampling pass.
pub const SENSOR_SETTLE: Duration = Duration::from_millis(500);

/// Interval between modem readiness polls while acquiring.
pub const MODEM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Nominal duration reserved for one SBD transmit/receive session.
pub const TRANSMIT_DURATION: Duration = Duration::from_secs(10);

/// Low-power interval between duty cycles.
pub const SLEEP_DURATION: Duration = Duration::from_secs(30);

/// Number of on/off pairs in the ground indicator sequence.
pub const INDICATOR_BLINKS: u8 = 5;

/// Duration of each half (on or off) of an indicator blink.
pub const INDICATOR_HALF_PERIOD: Duration = Duration::from_millis(150);
