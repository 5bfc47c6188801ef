//! Iridium SBD modem driver.
//!
//! [`IridiumModem`] implements the flight core's [`Communications`] seam on
//! top of a byte-level [`ModemTransport`]. All exchanges are blocking AT
//! command round trips bounded by per-byte timeouts; the transport decides
//! how to wait (UART polling on target, a scripted queue in tests).

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt::{self, Write as _};
use core::time::Duration;

use flight_core::buffers::OUTBOUND_CAPACITY;
use flight_core::collaborators::{Communications, ExchangeError};
use heapless::String;

use crate::logging::log_modem_fault;

pub mod parse;
#[cfg(target_os = "none")]
pub mod uart;

pub use parse::{ModemLine, ParseError, SessionReport, classify, sbd_checksum};

/// Time the 9603 needs after its sleep line goes high before it answers `AT`.
pub const WAKE_SETTLE: Duration = Duration::from_millis(100);

/// Response window for the boot-time `AT` liveness probe.
pub const PROBE_WINDOW: Duration = Duration::from_millis(50);

/// Response window for ordinary commands (`ATE0`, `AT+CSQ`, `AT+SBDWB`).
pub const COMMAND_WINDOW: Duration = Duration::from_secs(2);

/// Response window for `AT+SBDIX`; a satellite session can take tens of seconds.
pub const SESSION_WINDOW: Duration = Duration::from_secs(60);

/// Minimum `AT+CSQ` signal quality treated as ready to transmit.
pub const MIN_READY_SIGNAL_BARS: u8 = 2;

/// Longest response line retained; longer lines are truncated.
pub const MAX_RESPONSE_LINE: usize = 64;

/// Byte transport underneath the AT command set.
pub trait ModemTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Waits up to `timeout` for the next received byte.
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, LinkError>;

    /// Drives the modem sleep line (`true` = on/awake).
    fn set_sleep_line(&mut self, awake: bool);

    /// Blocks for `duration` without touching the link.
    fn pause(&mut self, duration: Duration);
}

/// Transport-level failures.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkError {
    Timeout,
    Io,
}

/// Failures surfaced by an AT round trip.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModemError {
    Link(LinkError),
    Parse(ParseError),
    /// Modem answered `ERROR`.
    CommandFailed,
    /// Command completed without the expected intermediate response.
    MissingResponse,
    /// `AT+SBDWB` returned a non-zero status code.
    WriteRejected(u8),
    /// `AT+SBDIX` reported an unsuccessful MO status.
    Session(SessionReport),
    /// `AT+SBDRB` payload failed its checksum.
    Checksum,
    /// Outbound payload exceeds the SBD MO maximum.
    PayloadTooLarge,
}

impl From<LinkError> for ModemError {
    fn from(error: LinkError) -> Self {
        Self::Link(error)
    }
}

impl From<ParseError> for ModemError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModemError::Link(LinkError::Timeout) => f.write_str("modem response timed out"),
            ModemError::Link(LinkError::Io) => f.write_str("modem UART error"),
            ModemError::Parse(error) => write!(f, "{error}"),
            ModemError::CommandFailed => f.write_str("modem returned ERROR"),
            ModemError::MissingResponse => f.write_str("modem omitted expected response"),
            ModemError::WriteRejected(code) => write!(f, "SBDWB rejected with status {code}"),
            ModemError::Session(report) => {
                write!(f, "SBDIX failed with MO status {}", report.mo_status)
            }
            ModemError::Checksum => f.write_str("SBDRB checksum mismatch"),
            ModemError::PayloadTooLarge => f.write_str("outbound payload too large"),
        }
    }
}

impl From<ModemError> for ExchangeError {
    fn from(error: ModemError) -> Self {
        match error {
            ModemError::Session(report) if report.no_network() => ExchangeError::NotReady,
            ModemError::Session(_)
            | ModemError::WriteRejected(_)
            | ModemError::CommandFailed
            | ModemError::PayloadTooLarge => ExchangeError::Rejected,
            ModemError::Link(_)
            | ModemError::Parse(_)
            | ModemError::MissingResponse
            | ModemError::Checksum => ExchangeError::Link,
        }
    }
}

/// AT-command driver for the Iridium 9603 SBD transceiver.
///
/// The transport's sleep line must be low when the driver is created.
pub struct IridiumModem<T> {
    transport: T,
    line: String<MAX_RESPONSE_LINE>,
    awake: bool,
}

impl<T: ModemTransport> IridiumModem<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            line: String::new(),
            awake: false,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `AT` and waits for `OK` within the probe window.
    ///
    /// A sleeping modem is woken for the probe and put back to sleep afterwards.
    pub fn probe(&mut self) -> Result<(), ModemError> {
        let was_awake = self.awake;
        if !was_awake {
            self.transport.set_sleep_line(true);
            self.transport.pause(WAKE_SETTLE);
        }

        let result = self
            .command("AT")
            .and_then(|()| self.expect_ok(PROBE_WINDOW));

        if !was_awake {
            self.transport.set_sleep_line(false);
        }
        result
    }

    /// Queries `AT+CSQ` and returns the signal quality in bars.
    pub fn signal_quality(&mut self) -> Result<u8, ModemError> {
        self.disable_echo()?;
        self.command("AT+CSQ")?;
        let mut bars = None;
        loop {
            match self.next_line(COMMAND_WINDOW)? {
                ModemLine::SignalQuality(value) => bars = Some(value),
                ModemLine::Ok => return bars.ok_or(ModemError::MissingResponse),
                ModemLine::Error => return Err(ModemError::CommandFailed),
                _ => {}
            }
        }
    }

    /// Runs a full SBD session: write MO buffer, `AT+SBDIX`, read MT buffer.
    ///
    /// Returns the number of inbound bytes copied into `inbound`.
    pub fn session(&mut self, outbound: &[u8], inbound: &mut [u8]) -> Result<usize, ModemError> {
        if outbound.len() > OUTBOUND_CAPACITY {
            return Err(ModemError::PayloadTooLarge);
        }
        self.disable_echo()?;
        if !outbound.is_empty() {
            self.write_mo_buffer(outbound)?;
        }

        let report = self.initiate_session()?;
        if !report.mo_delivered() {
            return Err(ModemError::Session(report));
        }
        if report.mt_received() {
            self.read_mt_buffer(inbound)
        } else {
            Ok(0)
        }
    }

    fn disable_echo(&mut self) -> Result<(), ModemError> {
        self.command("ATE0")?;
        self.expect_ok(COMMAND_WINDOW)
    }

    fn write_mo_buffer(&mut self, payload: &[u8]) -> Result<(), ModemError> {
        let mut command: String<16> = String::new();
        write!(command, "AT+SBDWB={}", payload.len()).map_err(|_| ModemError::PayloadTooLarge)?;
        self.command(&command)?;

        loop {
            match self.next_line(COMMAND_WINDOW)? {
                ModemLine::Ready => break,
                ModemLine::Error => return Err(ModemError::CommandFailed),
                _ => {}
            }
        }

        self.transport.write_all(payload)?;
        self.transport.write_all(&sbd_checksum(payload))?;

        loop {
            match self.next_line(COMMAND_WINDOW)? {
                ModemLine::Numeric(0) => return self.expect_ok(COMMAND_WINDOW),
                ModemLine::Numeric(code) => return Err(ModemError::WriteRejected(code)),
                ModemLine::Error => return Err(ModemError::CommandFailed),
                _ => {}
            }
        }
    }

    fn initiate_session(&mut self) -> Result<SessionReport, ModemError> {
        self.command("AT+SBDIX")?;
        let mut report = None;
        loop {
            match self.next_line(SESSION_WINDOW)? {
                ModemLine::Session(value) => report = Some(value),
                ModemLine::Ok => return report.ok_or(ModemError::MissingResponse),
                ModemLine::Error => return Err(ModemError::CommandFailed),
                _ => {}
            }
        }
    }

    /// `AT+SBDRB` answers in binary: length (BE u16), payload, checksum (BE u16), then `OK`.
    fn read_mt_buffer(&mut self, inbound: &mut [u8]) -> Result<usize, ModemError> {
        self.command("AT+SBDRB")?;

        let length = usize::from(u16::from_be_bytes([
            self.transport.read_byte(COMMAND_WINDOW)?,
            self.transport.read_byte(COMMAND_WINDOW)?,
        ]));

        let mut sum = 0u16;
        let mut copied = 0;
        for index in 0..length {
            let byte = self.transport.read_byte(COMMAND_WINDOW)?;
            sum = sum.wrapping_add(u16::from(byte));
            if let Some(slot) = inbound.get_mut(index) {
                *slot = byte;
                copied += 1;
            }
        }

        let expected = u16::from_be_bytes([
            self.transport.read_byte(COMMAND_WINDOW)?,
            self.transport.read_byte(COMMAND_WINDOW)?,
        ]);
        self.expect_ok(COMMAND_WINDOW)?;

        if sum == expected {
            Ok(copied)
        } else {
            Err(ModemError::Checksum)
        }
    }

    fn command(&mut self, command: &str) -> Result<(), ModemError> {
        self.transport.write_all(command.as_bytes())?;
        self.transport.write_all(b"\r")?;
        Ok(())
    }

    fn expect_ok(&mut self, window: Duration) -> Result<(), ModemError> {
        loop {
            match self.next_line(window)? {
                ModemLine::Ok => return Ok(()),
                ModemLine::Error => return Err(ModemError::CommandFailed),
                _ => {}
            }
        }
    }

    /// Reads the next non-empty, non-echo response line.
    fn next_line(&mut self, window: Duration) -> Result<ModemLine, ModemError> {
        loop {
            self.line.clear();
            loop {
                match self.transport.read_byte(window)? {
                    b'\n' => break,
                    b'\r' => {}
                    byte => {
                        // Overlong lines are truncated; the tail is never needed.
                        let _ = self.line.push(char::from(byte));
                    }
                }
            }

            let text = self.line.trim();
            if text.is_empty() || text.starts_with("AT") {
                continue;
            }
            return Ok(classify(text));
        }
    }
}

impl<T: ModemTransport> Communications for IridiumModem<T> {
    fn is_modem_reachable(&mut self) -> bool {
        match self.probe() {
            Ok(()) => true,
            Err(error) => {
                log_modem_fault("probe", &error);
                false
            }
        }
    }

    fn is_modem_ready(&mut self) -> bool {
        match self.signal_quality() {
            Ok(bars) => bars >= MIN_READY_SIGNAL_BARS,
            Err(error) => {
                log_modem_fault("csq", &error);
                false
            }
        }
    }

    fn set_modem_power(&mut self, awake: bool) {
        self.awake = awake;
        self.transport.set_sleep_line(awake);
    }

    fn transmit_receive(
        &mut self,
        outbound: &[u8],
        inbound: &mut [u8],
    ) -> Result<usize, ExchangeError> {
        self.session(outbound, inbound).map_err(|error| {
            log_modem_fault("session", &error);
            ExchangeError::from(error)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedTransport {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        sleep_line: Vec<bool>,
        pauses: Vec<Duration>,
        /// Stay silent unless the sleep line is high, like an unpowered 9603.
        needs_power: bool,
    }

    impl ScriptedTransport {
        fn replying(script: &[&[u8]]) -> Self {
            Self {
                rx: script.iter().flat_map(|chunk| chunk.iter().copied()).collect(),
                ..Self::default()
            }
        }

        fn powered(mut self) -> Self {
            self.needs_power = true;
            self
        }

        fn is_awake(&self) -> bool {
            self.sleep_line.last().copied().unwrap_or(false)
        }

        fn sent(&self) -> &str {
            core::str::from_utf8(&self.tx).unwrap_or("<binary>")
        }
    }

    impl ModemTransport for ScriptedTransport {
        fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
            self.tx.extend_from_slice(bytes);
            Ok(())
        }

        fn read_byte(&mut self, _: Duration) -> Result<u8, LinkError> {
            if self.needs_power && !self.is_awake() {
                return Err(LinkError::Timeout);
            }
            self.rx.pop_front().ok_or(LinkError::Timeout)
        }

        fn set_sleep_line(&mut self, awake: bool) {
            self.sleep_line.push(awake);
        }

        fn pause(&mut self, duration: Duration) {
            self.pauses.push(duration);
        }
    }

    #[test]
    fn probe_succeeds_on_ok_and_skips_echo() {
        let mut modem = IridiumModem::new(ScriptedTransport::replying(&[b"AT\r\r\nOK\r\n"]));
        assert!(modem.is_modem_reachable());
        assert_eq!(modem.transport().sent(), "AT\r");
    }

    #[test]
    fn probe_wakes_a_sleeping_modem_and_restores_the_line() {
        let mut modem =
            IridiumModem::new(ScriptedTransport::replying(&[b"OK\r\n"]).powered());
        assert!(modem.is_modem_reachable());
        assert_eq!(modem.transport().sleep_line, [true, false]);
        assert_eq!(modem.transport().pauses, [WAKE_SETTLE]);
    }

    #[test]
    fn probe_leaves_an_awake_modem_awake() {
        let mut modem =
            IridiumModem::new(ScriptedTransport::replying(&[b"OK\r\n"]).powered());
        modem.set_modem_power(true);
        assert!(modem.is_modem_reachable());
        assert_eq!(modem.transport().sleep_line, [true]);
        assert!(modem.transport().pauses.is_empty());
    }

    #[test]
    fn unpowered_modem_never_answers_commands() {
        let mut modem = IridiumModem::new(
            ScriptedTransport::replying(&[b"OK\r\n", b"+CSQ:5\r\n\r\nOK\r\n"]).powered(),
        );
        assert!(!modem.is_modem_ready());
    }

    #[test]
    fn silent_modem_is_unreachable() {
        let mut modem = IridiumModem::new(ScriptedTransport::default());
        assert!(!modem.is_modem_reachable());
    }

    #[test]
    fn readiness_requires_two_bars() {
        let mut weak = IridiumModem::new(ScriptedTransport::replying(&[
            b"OK\r\n",
            b"+CSQ:1\r\n\r\nOK\r\n",
        ]));
        assert!(!weak.is_modem_ready());

        let mut strong = IridiumModem::new(ScriptedTransport::replying(&[
            b"OK\r\n",
            b"+CSQ:4\r\n\r\nOK\r\n",
        ]));
        assert!(strong.is_modem_ready());
        assert_eq!(strong.transport().sent(), "ATE0\rAT+CSQ\r");
    }

    #[test]
    fn session_writes_payload_and_reads_mt_message() {
        let payload = [0x03, 0x01, 0x04];
        let reply = b"CUT";
        let reply_sum = sbd_checksum(reply);

        let mut script: Vec<u8> = Vec::new();
        script.extend_from_slice(b"OK\r\n");
        script.extend_from_slice(b"READY\r\n");
        script.extend_from_slice(b"0\r\n\r\nOK\r\n");
        script.extend_from_slice(b"+SBDIX: 0, 5, 1, 2, 3, 0\r\n\r\nOK\r\n");
        script.extend_from_slice(&[0x00, 0x03]);
        script.extend_from_slice(reply);
        script.extend_from_slice(&reply_sum);
        script.extend_from_slice(b"\r\nOK\r\n");

        let mut modem = IridiumModem::new(ScriptedTransport::replying(&[script.as_slice()]));
        let mut inbound = [0u8; 16];
        assert_eq!(modem.transmit_receive(&payload, &mut inbound), Ok(3));
        assert_eq!(&inbound[..3], reply);

        let mut expected_tx: Vec<u8> = Vec::new();
        expected_tx.extend_from_slice(b"ATE0\rAT+SBDWB=3\r");
        expected_tx.extend_from_slice(&payload);
        expected_tx.extend_from_slice(&sbd_checksum(&payload));
        expected_tx.extend_from_slice(b"AT+SBDIX\rAT+SBDRB\r");
        assert_eq!(modem.transport().tx, expected_tx);
    }

    #[test]
    fn no_network_session_maps_to_not_ready() {
        let mut modem = IridiumModem::new(ScriptedTransport::replying(&[
            b"OK\r\n",
            b"+SBDIX: 32, 6, 2, 0, 0, 0\r\nOK\r\n",
        ]));
        let mut inbound = [0u8; 4];
        assert_eq!(
            modem.transmit_receive(&[], &mut inbound),
            Err(ExchangeError::NotReady)
        );
    }

    #[test]
    fn corrupted_mt_message_is_a_link_error() {
        let mut script: Vec<u8> = Vec::new();
        script.extend_from_slice(b"OK\r\n+SBDIX: 1, 5, 1, 2, 2, 0\r\nOK\r\n");
        script.extend_from_slice(&[0x00, 0x02, b'h', b'i', 0x00, 0x00]);
        script.extend_from_slice(b"\r\nOK\r\n");

        let mut modem = IridiumModem::new(ScriptedTransport::replying(&[script.as_slice()]));
        let mut inbound = [0u8; 4];
        assert_eq!(
            modem.transmit_receive(&[], &mut inbound),
            Err(ExchangeError::Link)
        );
    }

    #[test]
    fn rejected_write_status_is_reported() {
        let mut modem = IridiumModem::new(ScriptedTransport::replying(&[
            b"OK\r\nREADY\r\n2\r\n\r\nOK\r\n",
        ]));
        assert_eq!(
            modem.session(&[1, 2], &mut [0u8; 4]),
            Err(ModemError::WriteRejected(2))
        );
    }

    #[test]
    fn oversized_payload_never_reaches_the_modem() {
        let mut modem = IridiumModem::new(ScriptedTransport::default());
        let payload = [0u8; OUTBOUND_CAPACITY + 1];
        assert_eq!(
            modem.session(&payload, &mut [0u8; 4]),
            Err(ModemError::PayloadTooLarge)
        );
        assert!(modem.transport().tx.is_empty());
    }

    #[test]
    fn power_changes_drive_the_sleep_line() {
        let mut modem = IridiumModem::new(ScriptedTransport::default());
        modem.set_modem_power(true);
        modem.set_modem_power(false);
        assert_eq!(modem.transport().sleep_line, [true, false]);
    }
}
