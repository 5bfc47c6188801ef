//! Status LED blink sequence shown at boot on the ground build.

use embassy_stm32::gpio::Output;
use embassy_time::Timer;
use flight_core::config::IndicatorPattern;

use crate::clock::to_embassy;

pub async fn play(led: &mut Output<'_>, pattern: IndicatorPattern) {
    let half_period = to_embassy(pattern.half_period);
    for _ in 0..pattern.blinks {
        led.set_high();
        Timer::after(half_period).await;
        led.set_low();
        Timer::after(half_period).await;
    }
}
