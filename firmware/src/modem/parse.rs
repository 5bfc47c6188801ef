//! Iridium 9603 AT response grammar.
//!
//! Each response line from the modem is classified into a [`ModemLine`]
//! using `winnow` combinators. Only the handful of responses the flight
//! computer relies on are decoded; anything else becomes [`ModemLine::Other`].

use core::fmt;

use winnow::ascii::{dec_uint, space0};
use winnow::combinator::{alt, eof, preceded, terminated};
use winnow::error::ContextError;
use winnow::prelude::*;

/// Errors raised while decoding a modem response.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// Line did not match the expected response grammar.
    Syntax,
    /// Numeric field was outside its documented range.
    OutOfRange,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax => f.write_str("malformed modem response"),
            ParseError::OutOfRange => f.write_str("modem response field out of range"),
        }
    }
}

/// Highest signal-quality value `AT+CSQ` reports (five bars).
pub const MAX_SIGNAL_BARS: u8 = 5;

/// Fields of a `+SBDIX:` session report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SessionReport {
    pub mo_status: u8,
    pub mo_msn: u16,
    pub mt_status: u8,
    pub mt_msn: u16,
    pub mt_length: u16,
    pub mt_queued: u16,
}

impl SessionReport {
    /// MO status 0..=4 means the outbound message reached the gateway.
    #[must_use]
    pub const fn mo_delivered(&self) -> bool {
        self.mo_status <= 4
    }

    /// MO status 32: no network service.
    #[must_use]
    pub const fn no_network(&self) -> bool {
        self.mo_status == 32
    }

    /// MT status 1: a message was received into the MT buffer.
    #[must_use]
    pub const fn mt_received(&self) -> bool {
        self.mt_status == 1
    }
}

/// Classified modem response line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModemLine {
    Ok,
    Error,
    /// `READY`, sent after `AT+SBDWB` when the modem awaits the binary payload.
    Ready,
    /// `+CSQ:n` signal quality in bars.
    SignalQuality(u8),
    /// `+SBDIX:` session report.
    Session(SessionReport),
    /// Bare numeric result code, as returned after an `AT+SBDWB` payload.
    Numeric(u8),
    Other,
}

/// Classifies one response line (without its line terminator).
#[must_use]
pub fn classify(line: &str) -> ModemLine {
    let line = line.trim();
    if let Ok(kind) = final_result().parse(line) {
        return kind;
    }
    if let Ok(bars) = parse_signal_quality(line) {
        return ModemLine::SignalQuality(bars);
    }
    if let Ok(report) = parse_session_report(line) {
        return ModemLine::Session(report);
    }
    if let Ok(code) = numeric().parse(line) {
        return ModemLine::Numeric(code);
    }
    ModemLine::Other
}

/// Parses `+CSQ:n` (optionally `+CSQ: n`).
pub fn parse_signal_quality(line: &str) -> Result<u8, ParseError> {
    let bars = signal_quality()
        .parse(line.trim())
        .map_err(|_| ParseError::Syntax)?;
    if bars > MAX_SIGNAL_BARS {
        return Err(ParseError::OutOfRange);
    }
    Ok(bars)
}

/// Parses `+SBDIX: <MO status>, <MOMSN>, <MT status>, <MTMSN>, <MT length>, <MT queued>`.
pub fn parse_session_report(line: &str) -> Result<SessionReport, ParseError> {
    session_report()
        .parse(line.trim())
        .map_err(|_| ParseError::Syntax)
}

/// Two-byte SBD checksum: the low 16 bits of the byte sum, big-endian.
#[must_use]
pub fn sbd_checksum(payload: &[u8]) -> [u8; 2] {
    payload
        .iter()
        .fold(0u16, |sum, byte| sum.wrapping_add(u16::from(*byte)))
        .to_be_bytes()
}

fn final_result<'a>() -> impl Parser<&'a str, ModemLine, ContextError> {
    terminated(
        alt((
            "OK".value(ModemLine::Ok),
            "ERROR".value(ModemLine::Error),
            "READY".value(ModemLine::Ready),
        )),
        eof,
    )
}

fn numeric<'a>() -> impl Parser<&'a str, u8, ContextError> {
    terminated(dec_uint, eof)
}

fn signal_quality<'a>() -> impl Parser<&'a str, u8, ContextError> {
    terminated(preceded(("+CSQ:", space0), dec_uint), eof)
}

fn field<'a, O>() -> impl Parser<&'a str, O, ContextError>
where
    O: winnow::ascii::Uint,
{
    preceded((space0, ',', space0), dec_uint)
}

fn session_report<'a>() -> impl Parser<&'a str, SessionReport, ContextError> {
    terminated(
        preceded(
            ("+SBDIX:", space0),
            (dec_uint, field(), field(), field(), field(), field()),
        ),
        (space0, eof),
    )
    .map(
        |(mo_status, mo_msn, mt_status, mt_msn, mt_length, mt_queued)| SessionReport {
            mo_status,
            mo_msn,
            mt_status,
            mt_msn,
            mt_length,
            mt_queued,
        },
    )
}
