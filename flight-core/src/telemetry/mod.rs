//! Lifecycle telemetry catalog and bounded event ring.
//!
//! Every observable step of the boot sequence and duty cycle lands here as a
//! typed record with a monotonically increasing [`EventId`]. The ring keeps the
//! most recent [`TELEMETRY_RING_CAPACITY`] records; firmware drains it into
//! defmt logs and the emulator into its transcript.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::collaborators::ExchangeError;
use crate::lifecycle::LifecycleState;

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    HealthCheck,
    CrashFlagArmed,
    DirtyRestart,
    StateEntered(LifecycleState),
    ModemPower,
    SamplesTaken,
    ModemReady,
    ExchangeCompleted,
    ExchangeFailed,
    ExchangeSkipped,
    AcquisitionExpired,
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::HealthCheck => f.write_str("health-check"),
            TelemetryEventKind::CrashFlagArmed => f.write_str("crash-flag-armed"),
            TelemetryEventKind::DirtyRestart => f.write_str("dirty-restart"),
            TelemetryEventKind::StateEntered(state) => write!(f, "state-entered {state}"),
            TelemetryEventKind::ModemPower => f.write_str("modem-power"),
            TelemetryEventKind::SamplesTaken => f.write_str("samples-taken"),
            TelemetryEventKind::ModemReady => f.write_str("modem-ready"),
            TelemetryEventKind::ExchangeCompleted => f.write_str("exchange-completed"),
            TelemetryEventKind::ExchangeFailed => f.write_str("exchange-failed"),
            TelemetryEventKind::ExchangeSkipped => f.write_str("exchange-skipped"),
            TelemetryEventKind::AcquisitionExpired => f.write_str("acquisition-expired"),
        }
    }
}

impl TelemetryEventKind {
    const HEALTH_CHECK_CODE: u16 = 0x0001;
    const CRASH_FLAG_ARMED_CODE: u16 = 0x0002;
    const DIRTY_RESTART_CODE: u16 = 0x0003;
    const STATE_ENTERED_BASE: u16 = 0x0010;
    const MODEM_POWER_CODE: u16 = 0x0020;
    const SAMPLES_TAKEN_CODE: u16 = 0x0021;
    const MODEM_READY_CODE: u16 = 0x0022;
    const EXCHANGE_COMPLETED_CODE: u16 = 0x0030;
    const EXCHANGE_FAILED_CODE: u16 = 0x0031;
    const EXCHANGE_SKIPPED_CODE: u16 = 0x0032;
    const ACQUISITION_EXPIRED_CODE: u16 = 0x0033;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::HealthCheck => Self::HEALTH_CHECK_CODE,
            TelemetryEventKind::CrashFlagArmed => Self::CRASH_FLAG_ARMED_CODE,
            TelemetryEventKind::DirtyRestart => Self::DIRTY_RESTART_CODE,
            TelemetryEventKind::StateEntered(state) => {
                Self::STATE_ENTERED_BASE + state_offset(state)
            }
            TelemetryEventKind::ModemPower => Self::MODEM_POWER_CODE,
            TelemetryEventKind::SamplesTaken => Self::SAMPLES_TAKEN_CODE,
            TelemetryEventKind::ModemReady => Self::MODEM_READY_CODE,
            TelemetryEventKind::ExchangeCompleted => Self::EXCHANGE_COMPLETED_CODE,
            TelemetryEventKind::ExchangeFailed => Self::EXCHANGE_FAILED_CODE,
            TelemetryEventKind::ExchangeSkipped => Self::EXCHANGE_SKIPPED_CODE,
            TelemetryEventKind::AcquisitionExpired => Self::ACQUISITION_EXPIRED_CODE,
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Hardware status bitfield after the health check.
    Status(u8),
    /// Modem power line level (`true` = awake).
    Power(bool),
    /// Sampling pass summary.
    Samples { count: u8, faults: u8 },
    /// Number of modem polls issued this cycle.
    Polls(u32),
    /// Inbound bytes received by a completed exchange.
    Received(u16),
    /// Error surfaced by a failed exchange.
    Exchange(ExchangeError),
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy,
{
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    #[must_use]
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Identifier the next recorded event will receive.
    #[must_use]
    pub fn next_event_id(&self) -> EventId {
        self.next_event_id
    }

    /// Records an event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }

    /// Iterates over records with an id at or after `since`, oldest first.
    pub fn since(&self, since: EventId) -> impl Iterator<Item = &TelemetryRecord<TInstant>> {
        self.oldest_first().filter(move |record| record.id >= since)
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

const fn state_offset(state: LifecycleState) -> u16 {
    match state {
        LifecycleState::Startup => 0,
        LifecycleState::AcquireAndSample => 1,
        LifecycleState::TransmitReceive => 2,
        LifecycleState::Sleep => 3,
    }
}

/// Saturates a count into the single-byte telemetry field.
#[must_use]
pub fn truncate_count(count: usize) -> u8 {
    match u8::try_from(count) {
        Ok(value) => value,
        Err(_) => u8::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ids_increase_and_ring_keeps_newest() {
        let mut recorder: TelemetryRecorder<u64, 4> = TelemetryRecorder::new();
        for tick in 0..6u64 {
            recorder.record(TelemetryEventKind::ModemReady, TelemetryPayload::Polls(1), tick);
        }

        assert_eq!(recorder.len(), 4);
        let ids: heapless::Vec<EventId, 4> =
            recorder.oldest_first().map(|record| record.id).collect();
        assert_eq!(ids.as_slice(), &[2, 3, 4, 5]);
        assert_eq!(recorder.latest().map(|record| record.timestamp), Some(5));
        assert_eq!(recorder.next_event_id(), 6);
    }

    #[test]
    fn since_filters_older_records() {
        let mut recorder: TelemetryRecorder<u64, 8> = TelemetryRecorder::new();
        recorder.record(TelemetryEventKind::HealthCheck, TelemetryPayload::Status(1), 0);
        let mark = recorder.next_event_id();
        recorder.record(TelemetryEventKind::ExchangeSkipped, TelemetryPayload::None, 1);

        let newer: heapless::Vec<TelemetryEventKind, 8> =
            recorder.since(mark).map(|record| record.event).collect();
        assert_eq!(newer.as_slice(), &[TelemetryEventKind::ExchangeSkipped]);
    }

    #[test]
    fn state_codes_are_distinct() {
        let codes = [
            LifecycleState::Startup,
            LifecycleState::AcquireAndSample,
            LifecycleState::TransmitReceive,
            LifecycleState::Sleep,
        ]
        .map(|state| TelemetryEventKind::StateEntered(state).to_raw());
        assert_eq!(codes, [0x10, 0x11, 0x12, 0x13]);
    }
}
