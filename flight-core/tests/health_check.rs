mod support;

use flight_core::boot::boot;
use flight_core::collaborators::{NoSensors, NullDebugChannel};
use flight_core::config::{BuildVariant, FlightConfig};
use flight_core::health::run_health_check;
use flight_core::status::{HardwareStatus, Subsystem};
use flight_core::telemetry::{TelemetryEventKind, TelemetryPayload};

use support::{MemoryStorage, MockInstant, MockModem, MockSensors, RecordingDebug};

#[test]
fn unreachable_modem_reads_all_zero() {
    let status = HardwareStatus::new();
    let bits = run_health_check(
        &status,
        &mut MockModem::unreachable(),
        None::<&mut NullDebugChannel>,
    );

    assert_eq!(bits, 0b0000_0000);
    assert_eq!(status.read(), 0b0000_0000);
}

#[test]
fn reachable_modem_sets_bit_zero() {
    let status = HardwareStatus::new();
    let bits = run_health_check(
        &status,
        &mut MockModem::never_ready(),
        None::<&mut NullDebugChannel>,
    );

    assert_eq!(bits, 0b0000_0001);
    assert!(status.is_healthy(Subsystem::Modem));
}

#[test]
fn rerun_clears_a_modem_that_went_away() {
    let status = HardwareStatus::new();
    let mut modem = MockModem::never_ready();
    run_health_check(&status, &mut modem, None::<&mut NullDebugChannel>);
    modem.reachable = false;
    run_health_check(&status, &mut modem, None::<&mut NullDebugChannel>);

    assert_eq!(status.read(), 0);
}

#[test]
fn debug_channel_receives_the_health_line() {
    let status = HardwareStatus::new();
    let mut debug = RecordingDebug::default();
    run_health_check(&status, &mut MockModem::never_ready(), Some(&mut debug));

    assert_eq!(debug.lines, ["<$00000001>"]);
}

#[test]
fn boot_records_health_in_flight_without_a_debug_channel() {
    let mut storage = MemoryStorage::blank();
    let (controller, report) = boot(
        FlightConfig::for_variant(BuildVariant::Flight),
        &mut storage,
        MockModem::never_ready(),
        NoSensors,
        Some(RecordingDebug::default()),
        MockInstant::default(),
    )
    .unwrap();

    assert_eq!(report.health, 0b0000_0001);
    assert_eq!(controller.status().read(), 0b0000_0001);
    assert!(controller.debug().is_none(), "flight drops the ground link");

    let latest = controller.telemetry().latest().unwrap();
    assert_eq!(latest.event, TelemetryEventKind::HealthCheck);
    assert_eq!(latest.details, TelemetryPayload::Status(1));
}

#[test]
fn boot_leaves_buffers_zeroed() {
    let mut storage = MemoryStorage::blank();
    let (controller, _) = boot(
        FlightConfig::for_variant(BuildVariant::Ground),
        &mut storage,
        MockModem::unreachable(),
        MockSensors::with_weather(),
        Some(RecordingDebug::default()),
        MockInstant::default(),
    )
    .unwrap();

    assert!(controller.buffers().is_zeroed());
    assert_eq!(
        controller.debug().unwrap().lines,
        ["1", "<$00000000>"]
    );
}

#[test]
fn sensors_do_not_touch_the_health_register() {
    let mut storage = MemoryStorage::blank();
    let (unreachable, report) = boot(
        FlightConfig::for_variant(BuildVariant::Flight),
        &mut storage,
        MockModem::unreachable(),
        MockSensors::with_weather(),
        None::<RecordingDebug>,
        MockInstant::default(),
    )
    .unwrap();
    assert_eq!(report.health, 0b0000_0000);
    assert_eq!(unreachable.status().read(), 0b0000_0000);

    let mut storage = MemoryStorage::blank();
    let (reachable, report) = boot(
        FlightConfig::for_variant(BuildVariant::Flight),
        &mut storage,
        MockModem::never_ready(),
        MockSensors::with_weather(),
        None::<RecordingDebug>,
        MockInstant::default(),
    )
    .unwrap();
    assert_eq!(report.health, 0b0000_0001);
    assert_eq!(reachable.status().read(), 0b0000_0001);
}
