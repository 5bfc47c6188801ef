#![allow(dead_code)]

use core::ops::Add;
use core::time::Duration;

use flight_core::clock::MonotonicInstant;
use flight_core::collaborators::{
    Communications, DebugChannel, ExchangeError, PersistentStorage, SampleSet, SensorChannel,
    SensorFault, SensorSample, SensorSuite,
};
use flight_core::lifecycle::{FlightController, Step, Transition};

/// Microsecond clock driven explicitly by the tests.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockInstant(pub u64);

impl MockInstant {
    pub fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000)
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_micros()).unwrap())
    }
}

impl MonotonicInstant for MockInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

/// Modem double that becomes ready after a fixed number of polls per wake.
#[derive(Debug, Default)]
pub struct MockModem {
    pub reachable: bool,
    /// Polls needed after each wake before reporting ready; `None` never readies.
    pub ready_after: Option<u32>,
    pub polls_since_wake: u32,
    pub total_polls: u32,
    pub power_log: Vec<bool>,
    pub sent: Vec<Vec<u8>>,
    pub reply: Vec<u8>,
    pub fail_with: Option<ExchangeError>,
}

impl MockModem {
    pub fn ready_on_poll(polls: u32) -> Self {
        Self {
            reachable: true,
            ready_after: Some(polls),
            ..Self::default()
        }
    }

    pub fn never_ready() -> Self {
        Self {
            reachable: true,
            ready_after: None,
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn is_awake(&self) -> bool {
        self.power_log.last().copied().unwrap_or(false)
    }
}

impl Communications for MockModem {
    fn is_modem_reachable(&mut self) -> bool {
        self.reachable
    }

    fn is_modem_ready(&mut self) -> bool {
        self.polls_since_wake += 1;
        self.total_polls += 1;
        self.ready_after
            .is_some_and(|threshold| self.polls_since_wake >= threshold)
    }

    fn set_modem_power(&mut self, awake: bool) {
        if awake {
            self.polls_since_wake = 0;
        }
        self.power_log.push(awake);
    }

    fn transmit_receive(
        &mut self,
        outbound: &[u8],
        inbound: &mut [u8],
    ) -> Result<usize, ExchangeError> {
        self.sent.push(outbound.to_vec());
        if let Some(error) = self.fail_with {
            return Err(error);
        }
        inbound[..self.reply.len()].copy_from_slice(&self.reply);
        Ok(self.reply.len())
    }
}

/// Sensor suite returning a canned sample set.
#[derive(Debug, Default)]
pub struct MockSensors {
    pub samples: SampleSet,
    pub passes: u32,
}

impl MockSensors {
    pub fn with_weather() -> Self {
        let mut samples = SampleSet::new();
        samples
            .push(SensorSample::Reading {
                channel: SensorChannel::Temperature,
                value: -5_120,
            })
            .unwrap();
        samples
            .push(SensorSample::Fault {
                channel: SensorChannel::Humidity,
                fault: SensorFault::OutOfRange,
            })
            .unwrap();
        Self {
            samples,
            passes: 0,
        }
    }
}

impl SensorSuite for MockSensors {
    fn sample_all(&mut self) -> SampleSet {
        self.passes += 1;
        self.samples.clone()
    }
}

/// Byte-addressed storage image that outlives a controller (simulated power loss).
#[derive(Clone, Debug)]
pub struct MemoryStorage {
    pub bytes: [u8; 64],
    pub writes: usize,
}

impl MemoryStorage {
    pub fn blank() -> Self {
        Self {
            bytes: [0x00; 64],
            writes: 0,
        }
    }

    pub fn erased() -> Self {
        Self {
            bytes: [0xFF; 64],
            writes: 0,
        }
    }

    /// Image as it would be read back after the board loses power.
    pub fn after_power_loss(&self) -> Self {
        Self {
            bytes: self.bytes,
            writes: 0,
        }
    }
}

impl PersistentStorage for MemoryStorage {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.bytes[usize::from(address)]
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        self.writes += 1;
        self.bytes[usize::from(address)] = value;
    }
}

/// Debug channel capturing every line.
#[derive(Debug, Default)]
pub struct RecordingDebug {
    pub lines: Vec<String>,
}

impl DebugChannel for RecordingDebug {
    fn write_line(&mut self, line: &str) {
        self.lines.push(line.to_owned());
    }
}

pub type TestController<S = MockSensors> =
    FlightController<MockModem, S, RecordingDebug, MockInstant>;

/// Ticks at `clock`, advances the clock by the returned wait, and returns the transition.
pub fn advance<S: SensorSuite>(
    controller: &mut TestController<S>,
    clock: &mut MockInstant,
) -> Transition {
    match controller.tick(*clock) {
        Step::Advanced(transition) => {
            *clock = *clock + transition.wait;
            transition
        }
        Step::Deferred(remaining) => panic!("tick deferred by {remaining:?}"),
    }
}
