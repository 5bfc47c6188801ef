//! Calibrated ADC reads of VREFINT and the die temperature sensor.

use core::ptr;

use embassy_stm32::Peri;
use embassy_stm32::adc::{Adc, SampleTime, Temperature, VrefInt};
use embassy_stm32::peripherals::ADC1;

use crate::sensors::{Calibration, ChipAdc};

/// Factory-programmed VREFINT conversion at 3.0 V.
const VREFINT_CAL_ADDR: *const u16 = 0x1FFF_75AA as *const u16;
/// Temperature sensor conversion at 30 °C, 3.0 V.
const TS_CAL1_ADDR: *const u16 = 0x1FFF_75A8 as *const u16;
/// Temperature sensor conversion at 130 °C, 3.0 V.
const TS_CAL2_ADDR: *const u16 = 0x1FFF_75CA as *const u16;

/// Reads the factory calibration words from system memory.
pub fn read_calibration() -> Calibration {
    // SAFETY: fixed, always-mapped system memory words on the STM32G0.
    unsafe {
        Calibration {
            vrefint: ptr::read_volatile(VREFINT_CAL_ADDR),
            ts_cal1: ptr::read_volatile(TS_CAL1_ADDR),
            ts_cal2: ptr::read_volatile(TS_CAL2_ADDR),
        }
    }
}

/// Embassy ADC wrapper for the internal channels.
pub struct InternalAdc<'d> {
    adc: Adc<'d, ADC1>,
    vrefint: VrefInt,
    temperature: Temperature,
    discard_next: bool,
}

impl<'d> InternalAdc<'d> {
    pub fn new(peri: Peri<'d, ADC1>) -> Self {
        let mut adc = Adc::new(peri);
        // Internal channels need the longest sample time for a stable reading.
        adc.set_sample_time(SampleTime::CYCLES160_5);
        let vrefint = adc.enable_vrefint();
        let temperature = adc.enable_temperature();
        Self {
            adc,
            vrefint,
            temperature,
            discard_next: true,
        }
    }

    /// The first conversion after enabling the channels is unreliable.
    fn settle(&mut self) {
        if self.discard_next {
            let _ = self.adc.blocking_read(&mut self.vrefint);
            self.discard_next = false;
        }
    }
}

impl ChipAdc for InternalAdc<'_> {
    fn read_vrefint(&mut self) -> u16 {
        self.settle();
        self.adc.blocking_read(&mut self.vrefint)
    }

    fn read_temperature(&mut self) -> u16 {
        self.settle();
        self.adc.blocking_read(&mut self.temperature)
    }
}
