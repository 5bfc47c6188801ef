use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::flash::Flash;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_sync::channel::Channel;
use flight_core::config::{BuildVariant, FlightConfig};

use crate::ground::{GroundChannel, GroundLink};
use crate::hw::adc::{InternalAdc, read_calibration};
use crate::hw::flash::StoragePage;
use crate::hw::indicator;
use crate::modem::IridiumModem;
use crate::modem::uart::UartTransport;
use crate::sensors::OnboardSensors;
use crate::storage::EmulatedEeprom;

mod flight_task;
mod ground_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static GROUND_QUEUE: GroundChannel = Channel::new();

/// Variant tag baked in at build time; unset builds the flight image.
const VARIANT_TAG: Option<&str> = option_env!("JAGSAT_VARIANT");

fn build_variant() -> BuildVariant {
    match VARIANT_TAG.map(BuildVariant::from_tag) {
        None => BuildVariant::Flight,
        Some(Ok(variant)) => variant,
        Some(Err(error)) => {
            defmt::warn!(
                "flight: {}, falling back to flight",
                defmt::Display2Format(&error)
            );
            BuildVariant::Flight
        }
    }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA2,
        PA5,
        PA8,
        PB0,
        PB1,
        ADC1,
        FLASH,
        USART2,
        USART5,
        ..
    } = hal::init(config);

    let variant = build_variant();

    let mut led = Output::new(PA5, Level::Low, Speed::Low);
    if let Some(pattern) = variant.indicator_pattern() {
        indicator::play(&mut led, pattern).await;
    }

    // Modem starts asleep; Startup wakes it.
    let sleep_line = Output::new(PA8, Level::Low, Speed::Low);
    let transport = UartTransport::new(USART5, PB0, PB1, sleep_line)
        .expect("failed to initialize modem UART");
    let modem = IridiumModem::new(transport);

    let sensors = OnboardSensors::new(InternalAdc::new(ADC1), read_calibration());
    let storage = EmulatedEeprom::load(StoragePage::new(Flash::new_blocking(FLASH)));

    let debug = if variant.has_debug_channel() {
        spawner
            .spawn(ground_task::run(GROUND_QUEUE.receiver(), USART2, PA2))
            .expect("failed to spawn ground link task");
        Some(GroundLink::new(GROUND_QUEUE.sender()))
    } else {
        None
    };

    spawner
        .spawn(flight_task::run(
            FlightConfig::for_variant(variant),
            storage,
            modem,
            sensors,
            debug,
        ))
        .expect("failed to spawn flight task");

    core::future::pending::<()>().await;
}
