//! Duty-cycle state machine.
//!
//! The controller advances one step per [`FlightController::tick`]:
//! modem wake, sensor settle plus modem acquisition, transmit/receive, sleep,
//! and back to wake. Waits are never performed in-line. Each tick returns the
//! duration the runtime must let pass before the next call, and the deadline
//! is also kept in the [`FlightContext`] so an early tick is refused without
//! side effects.

use core::fmt;
use core::time::Duration;

use crate::buffers::FlightBuffers;
use crate::clock::{MonotonicInstant, remaining_until};
use crate::collaborators::{Communications, DebugChannel, ExchangeError, SampleSet, SensorSuite};
use crate::config::FlightConfig;
use crate::readiness::{ReadinessFlags, ReadinessGate};
use crate::status::HardwareStatus;
use crate::telemetry::{
    EventId, TelemetryEventKind, TelemetryPayload, TelemetryRecorder, truncate_count,
};

pub mod timing;

/// Ground-link line emitted on Startup entry.
pub const LINE_STARTUP: &str = "System in Startup...";
/// Ground-link line emitted before each sampling pass.
pub const LINE_SAMPLING: &str = "Sampling...";
/// Ground-link line emitted when the modem readiness latch sets.
pub const LINE_MODEM_READY: &str = "Iridium Modem Ready!...";
/// Ground-link line emitted on TransmitReceive entry.
pub const LINE_TRANSMIT: &str = "Transmission in progress...";
/// Ground-link line emitted on Sleep entry.
pub const LINE_SLEEP: &str = "Transitioning to sleep mode...";

/// Duty-cycle states. Transitions are strictly cyclic.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LifecycleState {
    #[default]
    Startup,
    AcquireAndSample,
    TransmitReceive,
    Sleep,
}

impl LifecycleState {
    /// Pure transition function over the current state and readiness latches.
    ///
    /// AcquireAndSample holds until both latches are set, or until a configured
    /// acquisition bound expires after the sensors have been sampled.
    #[must_use]
    pub const fn next(self, flags: ReadinessFlags, acquisition_expired: bool) -> Self {
        match self {
            LifecycleState::Startup => LifecycleState::AcquireAndSample,
            LifecycleState::AcquireAndSample => {
                if flags.both() || (acquisition_expired && flags.sensor_ready) {
                    LifecycleState::TransmitReceive
                } else {
                    LifecycleState::AcquireAndSample
                }
            }
            LifecycleState::TransmitReceive => LifecycleState::Sleep,
            LifecycleState::Sleep => LifecycleState::Startup,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            LifecycleState::Startup => "startup",
            LifecycleState::AcquireAndSample => "acquire-and-sample",
            LifecycleState::TransmitReceive => "transmit-receive",
            LifecycleState::Sleep => "sleep",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the TransmitReceive step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExchangeReport {
    /// Exchange finished; carries the number of inbound bytes received.
    Completed(usize),
    /// Modem reported a failure. The cycle continues to Sleep regardless.
    Failed(ExchangeError),
    /// Acquisition bound expired before the modem became ready.
    Skipped,
}

/// One completed controller step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: LifecycleState,
    pub to: LifecycleState,
    /// Minimum time before the next tick.
    pub wait: Duration,
}

/// Result of a [`FlightController::tick`] call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Step {
    Advanced(Transition),
    /// Tick arrived before the previous step's deadline; nothing changed.
    Deferred(Duration),
}

impl Step {
    /// How long the runtime should wait before ticking again.
    #[must_use]
    pub const fn wait(&self) -> Duration {
        match self {
            Step::Advanced(transition) => transition.wait,
            Step::Deferred(remaining) => *remaining,
        }
    }
}

/// Mutable duty-cycle state owned by the controller.
#[derive(Clone, Debug)]
pub struct FlightContext<I> {
    state: LifecycleState,
    entry_pending: bool,
    gate: ReadinessGate,
    modem_woken_at: Option<I>,
    next_tick_at: Option<I>,
    acquisition_expired: bool,
    cycles_completed: u32,
    samples: SampleSet,
    last_exchange: Option<ExchangeReport>,
}

impl<I: MonotonicInstant> FlightContext<I> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Startup,
            entry_pending: true,
            gate: ReadinessGate::new(),
            modem_woken_at: None,
            next_tick_at: None,
            acquisition_expired: false,
            cycles_completed: 0,
            samples: SampleSet::new(),
            last_exchange: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[must_use]
    pub fn flags(&self) -> ReadinessFlags {
        self.gate.flags()
    }

    /// Modem polls issued in the current cycle.
    #[must_use]
    pub fn modem_polls(&self) -> u32 {
        self.gate.modem_polls()
    }

    /// Instant captured when the modem was last woken.
    #[must_use]
    pub fn modem_woken_at(&self) -> Option<I> {
        self.modem_woken_at
    }

    /// Earliest instant at which the next tick is accepted.
    #[must_use]
    pub fn next_tick_at(&self) -> Option<I> {
        self.next_tick_at
    }

    #[must_use]
    pub fn acquisition_expired(&self) -> bool {
        self.acquisition_expired
    }

    /// Number of Sleep steps completed since boot.
    #[must_use]
    pub fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    /// Samples collected by the most recent sampling pass.
    #[must_use]
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    #[must_use]
    pub fn last_exchange(&self) -> Option<ExchangeReport> {
        self.last_exchange
    }
}

impl<I: MonotonicInstant> Default for FlightContext<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Split borrow of the controller used by the boot sequence.
pub(crate) struct BootParts<'a, C, D> {
    pub status: &'a HardwareStatus,
    pub buffers: &'a mut FlightBuffers,
    pub comms: &'a mut C,
    pub debug: Option<&'a mut D>,
}

/// Lifecycle controller owning the collaborators and all duty-cycle state.
pub struct FlightController<C, S, D, I>
where
    I: MonotonicInstant,
{
    config: FlightConfig,
    comms: C,
    sensors: S,
    debug: Option<D>,
    status: HardwareStatus,
    buffers: FlightBuffers,
    context: FlightContext<I>,
    telemetry: TelemetryRecorder<I>,
}

impl<C, S, D, I> FlightController<C, S, D, I>
where
    C: Communications,
    S: SensorSuite,
    D: DebugChannel,
    I: MonotonicInstant,
{
    /// Creates a controller parked at Startup with zeroed buffers.
    ///
    /// Use [`crate::boot::boot`] to run the crash check and health check first.
    #[must_use]
    pub fn new(config: FlightConfig, comms: C, sensors: S, debug: Option<D>) -> Self {
        Self {
            config,
            comms,
            sensors,
            debug,
            status: HardwareStatus::new(),
            buffers: FlightBuffers::new(),
            context: FlightContext::new(),
            telemetry: TelemetryRecorder::new(),
        }
    }

    /// Runs exactly one state's work and returns the next minimum wait.
    pub fn tick(&mut self, now: I) -> Step {
        if let Some(remaining) = self
            .context
            .next_tick_at
            .and_then(|deadline| remaining_until(now, deadline))
        {
            return Step::Deferred(remaining);
        }

        let from = self.context.state;
        if self.context.entry_pending {
            self.context.entry_pending = false;
            self.record(TelemetryEventKind::StateEntered(from), TelemetryPayload::None, now);
        }

        let wait = match from {
            LifecycleState::Startup => self.run_startup(now),
            LifecycleState::AcquireAndSample => self.run_acquire_and_sample(now),
            LifecycleState::TransmitReceive => self.run_transmit_receive(now),
            LifecycleState::Sleep => self.run_sleep(now),
        };

        let to = from.next(self.context.gate.flags(), self.context.acquisition_expired);
        if to != from {
            self.context.state = to;
            self.context.entry_pending = true;
        }
        self.context.next_tick_at = Some(now + wait);

        Step::Advanced(Transition { from, to, wait })
    }

    fn run_startup(&mut self, now: I) -> Duration {
        self.emit(LINE_STARTUP);
        self.context.gate.reset();
        self.context.acquisition_expired = false;
        self.context.modem_woken_at = Some(now);
        self.comms.set_modem_power(true);
        self.record(TelemetryEventKind::ModemPower, TelemetryPayload::Power(true), now);
        Duration::ZERO
    }

    fn run_acquire_and_sample(&mut self, now: I) -> Duration {
        let timings = self.config.timings;

        let sampled = !self.context.gate.flags().sensor_ready;
        if sampled {
            self.emit(LINE_SAMPLING);
            self.context
                .gate
                .poll_sensors_ready(&mut self.sensors, &mut self.context.samples);
            self.buffers
                .stage_samples(self.status.read(), &self.context.samples);
            let faults = self
                .context
                .samples
                .iter()
                .filter(|sample| sample.is_fault())
                .count();
            self.record(
                TelemetryEventKind::SamplesTaken,
                TelemetryPayload::Samples {
                    count: truncate_count(self.context.samples.len()),
                    faults: truncate_count(faults),
                },
                now,
            );
        }

        let was_ready = self.context.gate.flags().modem_ready;
        let modem_became_ready = self.context.gate.poll_modem_ready(&mut self.comms) && !was_ready;
        let polls = self.context.gate.modem_polls();
        if modem_became_ready {
            self.emit(LINE_MODEM_READY);
            self.record(TelemetryEventKind::ModemReady, TelemetryPayload::Polls(polls), now);
        } else if !self.context.gate.flags().modem_ready {
            let elapsed = self
                .context
                .modem_woken_at
                .map_or(Duration::ZERO, |woken| now.saturating_duration_since(woken));
            if self.config.acquisition_limit.is_exceeded(polls, elapsed) {
                self.context.acquisition_expired = true;
                self.record(
                    TelemetryEventKind::AcquisitionExpired,
                    TelemetryPayload::Polls(polls),
                    now,
                );
            }
        }

        if sampled {
            timings.sensor_settle
        } else if modem_became_ready {
            Duration::ZERO
        } else {
            timings.modem_poll_interval
        }
    }

    fn run_transmit_receive(&mut self, now: I) -> Duration {
        self.emit(LINE_TRANSMIT);

        let report = if self.context.acquisition_expired {
            ExchangeReport::Skipped
        } else {
            let (outbound, inbound) = self.buffers.exchange_view();
            match self.comms.transmit_receive(outbound, inbound) {
                Ok(received) => {
                    self.buffers.set_inbound_len(received);
                    ExchangeReport::Completed(received)
                }
                Err(error) => {
                    self.buffers.set_inbound_len(0);
                    ExchangeReport::Failed(error)
                }
            }
        };

        let (event, payload) = match report {
            ExchangeReport::Completed(received) => (
                TelemetryEventKind::ExchangeCompleted,
                TelemetryPayload::Received(u16::try_from(received).unwrap_or(u16::MAX)),
            ),
            ExchangeReport::Failed(error) => (
                TelemetryEventKind::ExchangeFailed,
                TelemetryPayload::Exchange(error),
            ),
            ExchangeReport::Skipped => (TelemetryEventKind::ExchangeSkipped, TelemetryPayload::None),
        };
        self.record(event, payload, now);
        self.context.last_exchange = Some(report);

        self.config.timings.transmit_duration
    }

    fn run_sleep(&mut self, now: I) -> Duration {
        self.emit(LINE_SLEEP);
        self.comms.set_modem_power(false);
        self.record(TelemetryEventKind::ModemPower, TelemetryPayload::Power(false), now);
        self.context.gate.reset();
        self.context.acquisition_expired = false;
        self.context.cycles_completed = self.context.cycles_completed.wrapping_add(1);
        self.config.timings.sleep_duration
    }

    fn emit(&mut self, line: &str) {
        if let Some(debug) = self.debug.as_mut() {
            debug.write_line(line);
        }
    }

    pub(crate) fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        now: I,
    ) -> EventId {
        self.telemetry.record(event, payload, now)
    }

    /// Boot-time access for the health check and buffer zeroing.
    pub(crate) fn boot_parts(&mut self) -> BootParts<'_, C, D> {
        BootParts {
            status: &self.status,
            buffers: &mut self.buffers,
            comms: &mut self.comms,
            debug: self.debug.as_mut(),
        }
    }
}

impl<C, S, D, I> FlightController<C, S, D, I>
where
    I: MonotonicInstant,
{
    #[must_use]
    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.context.state
    }

    #[must_use]
    pub fn flags(&self) -> ReadinessFlags {
        self.context.gate.flags()
    }

    #[must_use]
    pub fn context(&self) -> &FlightContext<I> {
        &self.context
    }

    #[must_use]
    pub fn status(&self) -> &HardwareStatus {
        &self.status
    }

    #[must_use]
    pub fn buffers(&self) -> &FlightBuffers {
        &self.buffers
    }

    #[must_use]
    pub fn telemetry(&self) -> &TelemetryRecorder<I> {
        &self.telemetry
    }

    #[must_use]
    pub fn comms(&self) -> &C {
        &self.comms
    }

    #[must_use]
    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    #[must_use]
    pub fn debug(&self) -> Option<&D> {
        self.debug.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [LifecycleState; 4] = [
        LifecycleState::Startup,
        LifecycleState::AcquireAndSample,
        LifecycleState::TransmitReceive,
        LifecycleState::Sleep,
    ];

    fn flags(sensor_ready: bool, modem_ready: bool) -> ReadinessFlags {
        ReadinessFlags {
            sensor_ready,
            modem_ready,
        }
    }

    #[test]
    fn transition_table_is_total_and_deterministic() {
        for state in STATES {
            for sensor in [false, true] {
                for modem in [false, true] {
                    let input = flags(sensor, modem);
                    let first = state.next(input, false);
                    assert_eq!(first, state.next(input, false));

                    let expected = match state {
                        LifecycleState::Startup => LifecycleState::AcquireAndSample,
                        LifecycleState::AcquireAndSample if sensor && modem => {
                            LifecycleState::TransmitReceive
                        }
                        LifecycleState::AcquireAndSample => LifecycleState::AcquireAndSample,
                        LifecycleState::TransmitReceive => LifecycleState::Sleep,
                        LifecycleState::Sleep => LifecycleState::Startup,
                    };
                    assert_eq!(first, expected, "{state} with {input:?}");
                }
            }
        }
    }

    #[test]
    fn expiry_releases_acquire_only_after_sampling() {
        let state = LifecycleState::AcquireAndSample;
        assert_eq!(state.next(flags(true, false), true), LifecycleState::TransmitReceive);
        assert_eq!(state.next(flags(false, false), true), LifecycleState::AcquireAndSample);
        // Expiry has no effect outside AcquireAndSample.
        assert_eq!(
            LifecycleState::TransmitReceive.next(flags(false, false), true),
            LifecycleState::Sleep
        );
    }

    #[test]
    fn step_wait_reports_remaining_time() {
        let deferred = Step::Deferred(Duration::from_millis(250));
        assert_eq!(deferred.wait(), Duration::from_millis(250));

        let advanced = Step::Advanced(Transition {
            from: LifecycleState::Sleep,
            to: LifecycleState::Startup,
            wait: Duration::from_secs(30),
        });
        assert_eq!(advanced.wait(), Duration::from_secs(30));
    }
}
