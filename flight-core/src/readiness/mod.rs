//! Per-cycle readiness latches for the sensor suite and the modem.
//!
//! Both latches start false at Startup and flip to true at most once per duty
//! cycle. Once a latch is set, the gate stops calling the corresponding probe
//! until [`ReadinessGate::reset`] runs at the next cycle boundary; modem
//! status queries in particular can cost a billed transaction.

use crate::collaborators::{Communications, SampleSet, SensorSuite};

/// Snapshot of the two readiness latches.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ReadinessFlags {
    pub sensor_ready: bool,
    pub modem_ready: bool,
}

impl ReadinessFlags {
    /// Both latches cleared, as on Startup entry.
    #[must_use]
    pub const fn cleared() -> Self {
        Self {
            sensor_ready: false,
            modem_ready: false,
        }
    }

    #[must_use]
    pub const fn both(self) -> bool {
        self.sensor_ready && self.modem_ready
    }
}

/// Latching wrapper around the sensor and modem readiness probes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ReadinessGate {
    flags: ReadinessFlags,
    modem_polls: u32,
}

impl ReadinessGate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: ReadinessFlags::cleared(),
            modem_polls: 0,
        }
    }

    #[must_use]
    pub const fn flags(&self) -> ReadinessFlags {
        self.flags
    }

    /// Number of modem probes issued since the last reset.
    #[must_use]
    pub const fn modem_polls(&self) -> u32 {
        self.modem_polls
    }

    /// Samples the sensor suite on the first call of the cycle and latches readiness.
    ///
    /// Fresh samples land in `samples`; once latched, `samples` is left untouched
    /// and the suite is not touched again.
    pub fn poll_sensors_ready<S>(&mut self, sensors: &mut S, samples: &mut SampleSet) -> bool
    where
        S: SensorSuite + ?Sized,
    {
        if !self.flags.sensor_ready {
            *samples = sensors.sample_all();
            self.flags.sensor_ready = true;
        }
        true
    }

    /// Probes the modem until it reports ready, then latches.
    pub fn poll_modem_ready<C>(&mut self, comms: &mut C) -> bool
    where
        C: Communications + ?Sized,
    {
        if self.flags.modem_ready {
            return true;
        }
        self.modem_polls = self.modem_polls.saturating_add(1);
        if comms.is_modem_ready() {
            self.flags.modem_ready = true;
        }
        self.flags.modem_ready
    }

    /// Clears both latches and the poll counter for a new duty cycle.
    pub fn reset(&mut self) {
        self.flags = ReadinessFlags::cleared();
        self.modem_polls = 0;
    }
}
