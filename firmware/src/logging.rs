//! defmt / host console hooks for flight events.
//!
//! Each helper has a defmt body on target and a `println!` twin on host so
//! firmware modules compile and test without an RTT probe attached.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use flight_core::boot::BootReport;
use flight_core::config::BuildVariant;
use flight_core::crash::BootCheck;
use flight_core::lifecycle::Transition;
use flight_core::status::HealthLine;
use flight_core::telemetry::{EventId, TelemetryRecord, TelemetryRecorder};

use crate::clock::FirmwareInstant;
use crate::modem::ModemError;
use crate::storage::StorageError;

const fn crash_label(check: BootCheck) -> &'static str {
    match check {
        BootCheck::Armed => "armed",
        BootCheck::DirtyRestart { .. } => "dirty-restart",
        BootCheck::Skipped => "skipped",
    }
}

#[cfg(target_os = "none")]
pub fn log_boot(variant: BuildVariant, report: &BootReport) {
    defmt::info!(
        "flight: boot variant={} crash={} health={}",
        variant.tag(),
        crash_label(report.crash),
        defmt::Display2Format(&HealthLine(report.health))
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_boot(variant: BuildVariant, report: &BootReport) {
    println!(
        "flight: boot variant={} crash={} health={}",
        variant.tag(),
        crash_label(report.crash),
        HealthLine(report.health)
    );
}

#[cfg(target_os = "none")]
pub fn log_transition(transition: &Transition) {
    defmt::info!(
        "flight: {} -> {} wait={}ms",
        transition.from.label(),
        transition.to.label(),
        transition.wait.as_millis()
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_transition(transition: &Transition) {
    println!(
        "flight: {} -> {} wait={}ms",
        transition.from,
        transition.to,
        transition.wait.as_millis()
    );
}

#[cfg(target_os = "none")]
pub fn log_telemetry(record: &TelemetryRecord<FirmwareInstant>) {
    defmt::debug!(
        "telemetry:{} {=u16:#x} {} t={}us {}",
        record.id,
        record.event.to_raw(),
        defmt::Display2Format(&record.event),
        record.timestamp.as_micros(),
        defmt::Debug2Format(&record.details)
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_telemetry(record: &TelemetryRecord<FirmwareInstant>) {
    println!(
        "telemetry:{} {:#06x} {} t={}us {:?}",
        record.id,
        record.event.to_raw(),
        record.event,
        record.timestamp.as_micros(),
        record.details
    );
}

#[cfg(target_os = "none")]
pub fn log_modem_fault(context: &'static str, error: &ModemError) {
    defmt::warn!("modem: {} failed: {}", context, defmt::Display2Format(error));
}

#[cfg(not(target_os = "none"))]
pub fn log_modem_fault(context: &'static str, error: &ModemError) {
    println!("modem: {context} failed: {error}");
}

#[cfg(target_os = "none")]
pub fn log_storage_fault(error: &StorageError) {
    defmt::warn!("storage: {}", defmt::Display2Format(error));
}

#[cfg(not(target_os = "none"))]
pub fn log_storage_fault(error: &StorageError) {
    println!("storage: {error}");
}

#[cfg(target_os = "none")]
pub fn log_ground_dropped(line: &str) {
    defmt::warn!("ground: queue full, dropping {=str}", line);
}

#[cfg(not(target_os = "none"))]
pub fn log_ground_dropped(line: &str) {
    println!("ground: queue full, dropping {line}");
}

/// Logs every record at or after `cursor` and returns the next cursor.
pub fn drain_telemetry(recorder: &TelemetryRecorder<FirmwareInstant>, cursor: EventId) -> EventId {
    for record in recorder.since(cursor) {
        log_telemetry(record);
    }
    recorder.next_event_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_time::Instant;
    use flight_core::telemetry::{TelemetryEventKind, TelemetryPayload};

    #[test]
    fn drain_advances_past_logged_records() {
        let mut recorder = TelemetryRecorder::new();
        let at = FirmwareInstant::from(Instant::from_millis(5));
        recorder.record(TelemetryEventKind::HealthCheck, TelemetryPayload::Status(3), at);
        recorder.record(TelemetryEventKind::ModemPower, TelemetryPayload::Power(true), at);

        let cursor = drain_telemetry(&recorder, 0);
        assert_eq!(cursor, 2);
        assert_eq!(recorder.since(cursor).count(), 0);

        recorder.record(TelemetryEventKind::SamplesTaken, TelemetryPayload::None, at);
        assert_eq!(recorder.since(cursor).count(), 1);
        assert_eq!(drain_telemetry(&recorder, cursor), 3);
    }
}
