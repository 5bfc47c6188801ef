//! Boot sequence run once before the duty-cycle loop.
//!
//! Order: ground "startup complete" line, crash-flag check (flight only),
//! buffer zeroing, health check. The returned controller is parked at
//! Startup and ready for its first tick.

use crate::clock::MonotonicInstant;
use crate::collaborators::{Communications, DebugChannel, PersistentStorage, SensorSuite};
use crate::config::{ConfigError, FlightConfig};
use crate::crash::{BootCheck, CrashFlag};
use crate::health::run_health_check;
use crate::lifecycle::FlightController;
use crate::telemetry::{TelemetryEventKind, TelemetryPayload};

/// Line sent to the ground link once the board is up.
pub const LINE_STARTUP_COMPLETE: &str = "1";

/// Summary of what the boot sequence observed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BootReport {
    pub crash: BootCheck,
    /// Hardware status bitfield recorded by the health check.
    pub health: u8,
}

/// Validates `config`, runs the boot sequence and returns the controller.
///
/// The debug channel is dropped unless the configuration carries one, so a
/// flight build never writes to the ground link even when a port is wired.
///
/// # Errors
///
/// Returns the [`ConfigError`] from [`FlightConfig::validate`]; nothing is
/// written to storage or the debug channel in that case.
pub fn boot<C, S, D, P, I>(
    config: FlightConfig,
    storage: &mut P,
    comms: C,
    sensors: S,
    debug: Option<D>,
    now: I,
) -> Result<(FlightController<C, S, D, I>, BootReport), ConfigError>
where
    C: Communications,
    S: SensorSuite,
    D: DebugChannel,
    P: PersistentStorage,
    I: MonotonicInstant,
{
    config.validate()?;

    let debug = debug.filter(|_| config.variant.has_debug_channel());
    let mut controller = FlightController::new(config, comms, sensors, debug);

    let parts = controller.boot_parts();
    let mut debug = parts.debug;
    if let Some(debug) = debug.as_deref_mut() {
        debug.write_line(LINE_STARTUP_COMPLETE);
    }

    let crash = if config.variant.handles_crash_flag() {
        CrashFlag::new(storage).check_and_arm()
    } else {
        BootCheck::Skipped
    };

    parts.buffers.clear();
    let health = run_health_check(parts.status, parts.comms, debug);

    match crash {
        BootCheck::Armed => {
            controller.record(TelemetryEventKind::CrashFlagArmed, TelemetryPayload::None, now);
        }
        BootCheck::DirtyRestart { .. } => {
            controller.record(TelemetryEventKind::DirtyRestart, TelemetryPayload::None, now);
        }
        BootCheck::Skipped => {}
    }
    controller.record(
        TelemetryEventKind::HealthCheck,
        TelemetryPayload::Status(health),
        now,
    );

    Ok((controller, BootReport { crash, health }))
}
