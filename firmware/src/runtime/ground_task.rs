use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{Config as UartConfig, UartTx};

use crate::ground::{GROUND_BAUD, GroundReceiver, frame_line};

#[embassy_executor::task]
pub async fn run(
    receiver: GroundReceiver<'static>,
    usart: Peri<'static, hal::peripherals::USART2>,
    tx_pin: Peri<'static, hal::peripherals::PA2>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = GROUND_BAUD;

    let mut uart = UartTx::new_blocking(usart, tx_pin, config).expect("failed to initialize ground UART");

    loop {
        let line = receiver.receive().await;
        if uart.blocking_write(&frame_line(&line)).is_err() {
            defmt::warn!("ground: UART write error");
        }
    }
}
