//! Interfaces the flight core consumes from the rest of the system.
//!
//! Firmware and emulator crates provide concrete implementations: the modem
//! wire protocol, sensor drivers, non-volatile storage, and the ground-link
//! serial port all live behind these traits. Every call is blocking and
//! synchronous; the core never retains a borrowed buffer across calls.

use core::fmt;

use heapless::Vec;

/// Maximum number of sensor channels sampled in one pass.
pub const MAX_SENSOR_CHANNELS: usize = 8;

/// Errors surfaced by a transmit/receive exchange.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExchangeError {
    /// Modem refused the session because it has not acquired the network.
    NotReady,
    /// Modem accepted the session but the gateway rejected the message.
    Rejected,
    /// Serial link to the modem timed out or produced garbage.
    Link,
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::NotReady => f.write_str("modem not ready"),
            ExchangeError::Rejected => f.write_str("gateway rejected session"),
            ExchangeError::Link => f.write_str("modem link failure"),
        }
    }
}

/// Satellite modem collaborator.
pub trait Communications {
    /// Returns `true` when the modem answers a basic liveness probe.
    fn is_modem_reachable(&mut self) -> bool;

    /// Returns `true` once the modem has acquired the network and can transmit.
    fn is_modem_ready(&mut self) -> bool {
        self.is_modem_reachable()
    }

    /// Drives the modem power/sleep line (`true` wakes the modem).
    fn set_modem_power(&mut self, awake: bool);

    /// Sends `outbound` and fills `inbound` with any message waiting at the gateway.
    ///
    /// Returns the number of inbound bytes written.
    ///
    /// # Errors
    ///
    /// Returns an [`ExchangeError`] when the session does not complete.
    fn transmit_receive(&mut self, outbound: &[u8], inbound: &mut [u8])
    -> Result<usize, ExchangeError>;
}

/// Physical quantity reported by a sensor channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorChannel {
    Temperature,
    Pressure,
    Humidity,
    SupplyVoltage,
    Other(u8),
}

impl SensorChannel {
    /// Compact code used when staging readings into the outbound buffer.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            SensorChannel::Temperature => 0x01,
            SensorChannel::Pressure => 0x02,
            SensorChannel::Humidity => 0x03,
            SensorChannel::SupplyVoltage => 0x04,
            SensorChannel::Other(code) => code,
        }
    }
}

/// Reason a sensor channel could not produce a reading.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorFault {
    /// Device did not acknowledge on its bus.
    NoResponse,
    /// Device answered but the value failed its validity check.
    OutOfRange,
    /// Driver-specific code.
    Other(u8),
}

impl SensorFault {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            SensorFault::NoResponse => 0x01,
            SensorFault::OutOfRange => 0x02,
            SensorFault::Other(code) => code,
        }
    }
}

/// One channel's result: a reading in driver-defined fixed-point units, or a fault.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorSample {
    Reading { channel: SensorChannel, value: i32 },
    Fault { channel: SensorChannel, fault: SensorFault },
}

impl SensorSample {
    #[must_use]
    pub const fn channel(&self) -> SensorChannel {
        match self {
            SensorSample::Reading { channel, .. } | SensorSample::Fault { channel, .. } => *channel,
        }
    }

    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, SensorSample::Fault { .. })
    }
}

/// Readings gathered in one sampling pass.
pub type SampleSet = Vec<SensorSample, MAX_SENSOR_CHANNELS>;

/// Sensor suite collaborator.
pub trait SensorSuite {
    /// Samples every channel once. Partial failures are reported per channel.
    fn sample_all(&mut self) -> SampleSet;
}

/// Byte-addressed non-volatile storage that survives power loss.
pub trait PersistentStorage {
    fn read_byte(&mut self, address: u16) -> u8;

    fn write_byte(&mut self, address: u16, value: u8);
}

/// Line-oriented debug channel present in the ground configuration.
pub trait DebugChannel {
    fn write_line(&mut self, line: &str);
}

/// Sensor suite with no channels, used when a board carries no sensors.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoSensors;

impl SensorSuite for NoSensors {
    fn sample_all(&mut self) -> SampleSet {
        SampleSet::new()
    }
}

/// Debug channel that discards every line.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullDebugChannel;

impl DebugChannel for NullDebugChannel {
    fn write_line(&mut self, _: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_reports_channel_for_both_variants() {
        let reading = SensorSample::Reading {
            channel: SensorChannel::Pressure,
            value: 101_325,
        };
        let fault = SensorSample::Fault {
            channel: SensorChannel::Humidity,
            fault: SensorFault::NoResponse,
        };

        assert_eq!(reading.channel(), SensorChannel::Pressure);
        assert!(!reading.is_fault());
        assert_eq!(fault.channel(), SensorChannel::Humidity);
        assert!(fault.is_fault());
    }

    #[test]
    fn empty_suite_samples_nothing() {
        let mut sensors = NoSensors;
        assert!(sensors.sample_all().is_empty());
    }
}
