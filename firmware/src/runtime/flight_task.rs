use embassy_time::Timer;
use flight_core::boot::boot;
use flight_core::config::FlightConfig;
use flight_core::lifecycle::Step;

use crate::clock::{FirmwareInstant, to_embassy};
use crate::ground::GroundLink;
use crate::hw::adc::InternalAdc;
use crate::hw::flash::StoragePage;
use crate::logging::{drain_telemetry, log_boot, log_transition};
use crate::modem::IridiumModem;
use crate::modem::uart::UartTransport;
use crate::sensors::OnboardSensors;
use crate::storage::EmulatedEeprom;

#[embassy_executor::task]
pub async fn run(
    config: FlightConfig,
    mut storage: EmulatedEeprom<StoragePage<'static>>,
    modem: IridiumModem<UartTransport>,
    sensors: OnboardSensors<InternalAdc<'static>>,
    debug: Option<GroundLink<'static>>,
) -> ! {
    let booted = boot(
        config,
        &mut storage,
        modem,
        sensors,
        debug,
        FirmwareInstant::now(),
    );
    let (mut controller, report) = match booted {
        Ok(booted) => booted,
        Err(error) => {
            defmt::error!("flight: boot rejected: {}", defmt::Display2Format(&error));
            loop {
                core::future::pending::<()>().await;
            }
        }
    };
    log_boot(config.variant, &report);

    let mut cursor = drain_telemetry(controller.telemetry(), 0);
    loop {
        let step = controller.tick(FirmwareInstant::now());
        if let Step::Advanced(transition) = step {
            log_transition(&transition);
        }
        cursor = drain_telemetry(controller.telemetry(), cursor);
        Timer::after(to_embassy(step.wait())).await;
    }
}
