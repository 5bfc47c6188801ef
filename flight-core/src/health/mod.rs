//! Boot-time health check.

use core::fmt::Write;

use heapless::String;

use crate::collaborators::{Communications, DebugChannel};
use crate::status::{HardwareStatus, Subsystem};

/// Longest line the health check writes (`<$` + 8 digits + `>`).
pub const HEALTH_LINE_LEN: usize = 11;

/// Probes the modem and records the result in bit 0 of `status`.
///
/// An unreachable modem is a normal outcome (bit 0 cleared), never an error.
/// The remaining bits are left untouched.
/// When a debug channel is supplied the resulting bitfield is echoed to it.
/// Returns the recorded bitfield.
pub fn run_health_check<C, D>(
    status: &HardwareStatus,
    comms: &mut C,
    debug: Option<&mut D>,
) -> u8
where
    C: Communications + ?Sized,
    D: DebugChannel + ?Sized,
{
    status.set(Subsystem::Modem, comms.is_modem_reachable());

    if let Some(debug) = debug {
        let mut line: String<HEALTH_LINE_LEN> = String::new();
        if write!(line, "{}", status.health_line()).is_ok() {
            debug.write_line(&line);
        }
    }

    status.read()
}
