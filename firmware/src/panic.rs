//! Panic handler. The crash flag stays SET, so the next boot reports a dirty restart.

use core::panic::PanicInfo;

#[panic_handler]
fn on_panic(info: &PanicInfo) -> ! {
    defmt::error!("flight: panic {}", defmt::Display2Format(info));
    cortex_m::asm::udf();
}
