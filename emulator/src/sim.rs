//! Simulated collaborators and clock for the host emulator.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io::{self, ErrorKind};
use std::ops::Add;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use flight_core::clock::MonotonicInstant;
use flight_core::collaborators::{
    Communications, DebugChannel, ExchangeError, PersistentStorage, SampleSet, SensorChannel,
    SensorFault, SensorSample, SensorSuite,
};

/// Simulated time since power-on.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct SimInstant(Duration);

impl SimInstant {
    pub const BOOT: Self = Self(Duration::ZERO);

    pub fn since_boot(self) -> Duration {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl MonotonicInstant for SimInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// Iridium modem model: acquires signal after a fixed number of polls per wake.
#[derive(Debug)]
pub struct SimModem {
    reachable: bool,
    /// Polls after each wake before signal is acquired; `None` never acquires.
    acquire_after: Option<u32>,
    awake: bool,
    polls_since_wake: u32,
    sessions: u32,
}

impl SimModem {
    pub fn new(reachable: bool, acquire_after: Option<u32>) -> Self {
        Self {
            reachable,
            acquire_after,
            awake: false,
            polls_since_wake: 0,
            sessions: 0,
        }
    }

    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    /// Only a powered modem answers on its serial link.
    fn answers(&self) -> bool {
        self.reachable && self.awake
    }
}

impl Communications for SimModem {
    /// Wakes a sleeping modem for the probe and restores its power state.
    fn is_modem_reachable(&mut self) -> bool {
        let was_awake = self.awake;
        self.awake = true;
        let answered = self.answers();
        self.awake = was_awake;
        answered
    }

    fn is_modem_ready(&mut self) -> bool {
        if !self.answers() {
            return false;
        }
        self.polls_since_wake += 1;
        self.acquire_after
            .is_some_and(|needed| self.polls_since_wake >= needed)
    }

    fn set_modem_power(&mut self, awake: bool) {
        self.awake = awake;
        self.polls_since_wake = 0;
    }

    fn transmit_receive(
        &mut self,
        outbound: &[u8],
        inbound: &mut [u8],
    ) -> Result<usize, ExchangeError> {
        if !self.awake {
            return Err(ExchangeError::NotReady);
        }
        self.sessions += 1;

        // Gateway acknowledges with the session number and the bytes it received.
        let mut reply = Vec::with_capacity(6);
        reply.extend_from_slice(&self.sessions.to_be_bytes()[2..]);
        reply.extend_from_slice(&u16::try_from(outbound.len()).unwrap_or(u16::MAX).to_be_bytes());
        reply.extend_from_slice(b"OK");

        let count = reply.len().min(inbound.len());
        inbound[..count].copy_from_slice(&reply[..count]);
        Ok(count)
    }
}

/// Balloon payload sensors following a fixed ascent profile.
#[derive(Debug, Default)]
pub struct SimSensors {
    passes: u32,
}

impl SimSensors {
    /// Temperature falls 0.65 °C and pressure 12 hPa per pass until they bottom out.
    fn profile(&self) -> (i32, i32) {
        let pass = i32::try_from(self.passes).unwrap_or(i32::MAX);
        let temperature = 1_500_i32.saturating_sub(pass.saturating_mul(65)).max(-6_000);
        let pressure = 101_325_i32.saturating_sub(pass.saturating_mul(1_200)).max(500);
        (temperature, pressure)
    }
}

impl SensorSuite for SimSensors {
    fn sample_all(&mut self) -> SampleSet {
        let (temperature, pressure) = self.profile();
        self.passes += 1;

        let mut samples = SampleSet::new();
        let readings = [
            SensorSample::Reading {
                channel: SensorChannel::Temperature,
                value: temperature,
            },
            SensorSample::Reading {
                channel: SensorChannel::Pressure,
                value: pressure,
            },
            // The humidity probe ices over below freezing.
            if temperature < 0 {
                SensorSample::Fault {
                    channel: SensorChannel::Humidity,
                    fault: SensorFault::OutOfRange,
                }
            } else {
                SensorSample::Reading {
                    channel: SensorChannel::Humidity,
                    value: 45,
                }
            },
        ];
        for sample in readings {
            let _ = samples.push(sample);
        }
        samples
    }
}

/// Bytes in the EEPROM image.
pub const IMAGE_LEN: usize = 64;

/// EEPROM image, optionally persisted to a file after every write.
///
/// A missing file starts as a zeroed image, the state of a freshly
/// provisioned board whose crash flag was cleared on the bench.
#[derive(Debug)]
pub struct ImageStorage {
    bytes: [u8; IMAGE_LEN],
    path: Option<PathBuf>,
    error: Option<io::Error>,
}

impl ImageStorage {
    pub fn in_memory() -> Self {
        Self {
            bytes: [0; IMAGE_LEN],
            path: None,
            error: None,
        }
    }

    pub fn open(path: PathBuf) -> io::Result<Self> {
        let mut bytes = [0; IMAGE_LEN];
        match fs::read(&path) {
            Ok(contents) => {
                let len = contents.len().min(IMAGE_LEN);
                bytes[..len].copy_from_slice(&contents[..len]);
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => return Err(error),
        }
        Ok(Self {
            bytes,
            path: Some(path),
            error: None,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Surfaces the first write-back failure, if any.
    pub fn take_error(&mut self) -> io::Result<()> {
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn persist(&mut self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(error) = fs::write(path, self.bytes) {
            self.error.get_or_insert(error);
        }
    }
}

impl PersistentStorage for ImageStorage {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.bytes
            .get(usize::from(address))
            .copied()
            .unwrap_or(0xFF)
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        if let Some(slot) = self.bytes.get_mut(usize::from(address)) {
            *slot = value;
            self.persist();
        }
    }
}

/// Shared queue of ground-link lines awaiting transcription.
pub type GroundLines = Rc<RefCell<VecDeque<String>>>;

/// Debug channel that captures ground-link lines for the transcript.
#[derive(Debug, Default)]
pub struct GroundCapture {
    lines: GroundLines,
}

impl GroundCapture {
    pub fn new(lines: GroundLines) -> Self {
        Self { lines }
    }
}

impl DebugChannel for GroundCapture {
    fn write_line(&mut self, line: &str) {
        self.lines.borrow_mut().push_back(line.to_owned());
    }
}
