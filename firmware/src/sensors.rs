//! On-chip sensor suite: supply rail via VREFINT and die temperature.
//!
//! Conversions use the factory calibration words, which are taken at
//! VDDA = 3.0 V. The ADC itself sits behind [`ChipAdc`] so the arithmetic
//! runs on host.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use flight_core::collaborators::{SampleSet, SensorChannel, SensorFault, SensorSample, SensorSuite};

/// VDDA at which the calibration words were recorded.
pub const CALIBRATION_MILLIVOLTS: u32 = 3_000;

/// Temperatures of the `TS_CAL1` / `TS_CAL2` calibration points, in °C.
pub const TS_CAL1_CELSIUS: i32 = 30;
pub const TS_CAL2_CELSIUS: i32 = 130;

/// Plausible supply rail window for the flight board.
pub const SUPPLY_MIN_MILLIVOLTS: u16 = 1_700;
pub const SUPPLY_MAX_MILLIVOLTS: u16 = 3_600;

/// Factory calibration words read once at startup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Calibration {
    pub vrefint: u16,
    pub ts_cal1: u16,
    pub ts_cal2: u16,
}

/// Raw ADC conversions needed by the suite.
pub trait ChipAdc {
    fn read_vrefint(&mut self) -> u16;

    fn read_temperature(&mut self) -> u16;
}

/// Supply rail in millivolts from a VREFINT conversion. `None` for a zero reading.
pub fn supply_millivolts(vrefint_cal: u16, raw: u16) -> Option<u16> {
    if raw == 0 {
        return None;
    }
    let millivolts = CALIBRATION_MILLIVOLTS * u32::from(vrefint_cal) / u32::from(raw);
    u16::try_from(millivolts).ok()
}

/// Die temperature in hundredths of a degree Celsius.
///
/// The raw conversion is first rescaled from `vdda_mv` to the 3.0 V
/// calibration reference, then interpolated between the two calibration points.
pub fn temperature_centidegrees(calibration: &Calibration, raw: u16, vdda_mv: u16) -> Option<i32> {
    let span = i32::from(calibration.ts_cal2) - i32::from(calibration.ts_cal1);
    if span <= 0 {
        return None;
    }
    let scaled = i32::from(raw) * i32::from(vdda_mv) / 3_000;
    let offset = scaled - i32::from(calibration.ts_cal1);
    Some(offset * (TS_CAL2_CELSIUS - TS_CAL1_CELSIUS) * 100 / span + TS_CAL1_CELSIUS * 100)
}

fn supply_in_window(millivolts: u16) -> bool {
    (SUPPLY_MIN_MILLIVOLTS..=SUPPLY_MAX_MILLIVOLTS).contains(&millivolts)
}

/// [`SensorSuite`] over the MCU's internal channels.
pub struct OnboardSensors<A> {
    adc: A,
    calibration: Calibration,
}

impl<A: ChipAdc> OnboardSensors<A> {
    pub fn new(adc: A, calibration: Calibration) -> Self {
        Self { adc, calibration }
    }

    fn supply(&mut self) -> Option<u16> {
        supply_millivolts(self.calibration.vrefint, self.adc.read_vrefint())
    }
}

impl<A: ChipAdc> SensorSuite for OnboardSensors<A> {
    fn sample_all(&mut self) -> SampleSet {
        let mut samples = SampleSet::new();

        let supply = self.supply();
        let supply_sample = match supply {
            Some(millivolts) if supply_in_window(millivolts) => SensorSample::Reading {
                channel: SensorChannel::SupplyVoltage,
                value: i32::from(millivolts),
            },
            _ => SensorSample::Fault {
                channel: SensorChannel::SupplyVoltage,
                fault: SensorFault::OutOfRange,
            },
        };

        let raw_temperature = self.adc.read_temperature();
        let temperature = supply
            .filter(|millivolts| supply_in_window(*millivolts))
            .and_then(|millivolts| {
                temperature_centidegrees(&self.calibration, raw_temperature, millivolts)
            });
        let temperature_sample = match temperature {
            Some(value) => SensorSample::Reading {
                channel: SensorChannel::Temperature,
                value,
            },
            None => SensorSample::Fault {
                channel: SensorChannel::Temperature,
                fault: SensorFault::OutOfRange,
            },
        };

        // Two entries never exceed the sample set capacity.
        let _ = samples.push(temperature_sample);
        let _ = samples.push(supply_sample);
        samples
    }
}
