//! USART5 transport for the Iridium modem.

use core::time::Duration;

use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::gpio::Output;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use embassy_time::{Instant, block_for};
use embedded_io::{Read, ReadReady, Write};
use static_cell::StaticCell;

use super::{LinkError, ModemTransport};
use crate::clock::to_embassy;

/// The 9603 ships configured for 19200 8N1.
const MODEM_UART_BAUD: u32 = 19_200;

/// Sized for one full `AT+SBDRB` response plus framing.
const MODEM_UART_BUFFER_SIZE: usize = 512;

static UART_TX_BUFFER: StaticCell<[u8; MODEM_UART_BUFFER_SIZE]> = StaticCell::new();
static UART_RX_BUFFER: StaticCell<[u8; MODEM_UART_BUFFER_SIZE]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct ModemIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

/// Buffered UART plus the modem sleep-control line.
pub struct UartTransport {
    uart: BufferedUart<'static>,
    sleep: Output<'static>,
}

impl UartTransport {
    /// Brings up USART5 on PB0 (TX) / PB1 (RX). Call at most once.
    pub fn new(
        usart: Peri<'static, hal::peripherals::USART5>,
        tx_pin: Peri<'static, hal::peripherals::PB0>,
        rx_pin: Peri<'static, hal::peripherals::PB1>,
        sleep: Output<'static>,
    ) -> Result<Self, hal::usart::ConfigError> {
        let mut config = UartConfig::default();
        config.baudrate = MODEM_UART_BAUD;
        config.data_bits = DataBits::DataBits8;
        config.stop_bits = StopBits::STOP1;
        config.parity = Parity::ParityNone;

        let uart = BufferedUart::new(
            usart,
            rx_pin,
            tx_pin,
            UART_TX_BUFFER.init([0; MODEM_UART_BUFFER_SIZE]),
            UART_RX_BUFFER.init([0; MODEM_UART_BUFFER_SIZE]),
            ModemIrqs,
            config,
        )?;

        Ok(Self { uart, sleep })
    }
}

impl ModemTransport for UartTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.uart.write_all(bytes).map_err(|_| LinkError::Io)?;
        self.uart.flush().map_err(|_| LinkError::Io)
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<u8, LinkError> {
        let deadline = Instant::now() + to_embassy(timeout);
        let mut byte = [0u8; 1];
        loop {
            if self.uart.read_ready().map_err(|_| LinkError::Io)? {
                match self.uart.read(&mut byte) {
                    Ok(0) => {}
                    Ok(_) => return Ok(byte[0]),
                    Err(_) => return Err(LinkError::Io),
                }
            } else if Instant::now() >= deadline {
                return Err(LinkError::Timeout);
            }
        }
    }

    fn set_sleep_line(&mut self, awake: bool) {
        if awake {
            self.sleep.set_high();
        } else {
            self.sleep.set_low();
        }
    }

    fn pause(&mut self, duration: Duration) {
        block_for(to_embassy(duration));
    }
}
