//! Hardware status registry.
//!
//! An 8-bit health register with one bit per monitored subsystem. Mutation
//! goes exclusively through [`HardwareStatus::set_bit`] so the mapping between
//! bit index and subsystem lives in one place ([`Subsystem`]). The backing
//! store is a `portable_atomic::AtomicU8`, so the read-modify-write cannot be
//! torn by interrupt-driven code on single-core MCUs without native CAS.

use core::fmt;

use portable_atomic::{AtomicU8, Ordering};

/// Number of subsystem slots tracked by the register.
pub const STATUS_BITS: u8 = 8;

/// Monitored subsystems and their fixed bit positions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Subsystem {
    /// Iridium modem answered the health probe.
    Modem,
    /// Slots 1..=7 are reserved for individual sensor subsystems.
    Reserved(u8),
}

impl Subsystem {
    /// Deterministic bit index for the subsystem.
    #[must_use]
    pub const fn bit_index(self) -> u8 {
        match self {
            Subsystem::Modem => 0,
            Subsystem::Reserved(index) => index,
        }
    }

    /// Attempts to construct a [`Subsystem`] from a raw bit index.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Subsystem::Modem),
            1..=7 => Some(Subsystem::Reserved(index)),
            _ => None,
        }
    }
}

/// Interrupt-safe subsystem health bitfield.
#[derive(Debug, Default)]
pub struct HardwareStatus {
    bits: AtomicU8,
}

impl HardwareStatus {
    /// Creates a register with every subsystem marked unhealthy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Sets or clears exactly one bit, leaving all others unchanged.
    ///
    /// # Panics
    ///
    /// Panics when `index` is outside `0..8`. An out-of-range index is a
    /// programming error rather than a runtime condition.
    pub fn set_bit(&self, index: u8, value: bool) {
        assert!(
            index < STATUS_BITS,
            "hardware status bit index {index} out of range"
        );
        let mask = 1u8 << index;
        if value {
            self.bits.fetch_or(mask, Ordering::AcqRel);
        } else {
            self.bits.fetch_and(!mask, Ordering::AcqRel);
        }
    }

    /// Records the health of a named subsystem.
    pub fn set(&self, subsystem: Subsystem, healthy: bool) {
        self.set_bit(subsystem.bit_index(), healthy);
    }

    /// Returns `true` when the subsystem's bit is set.
    #[must_use]
    pub fn is_healthy(&self, subsystem: Subsystem) -> bool {
        self.read() & (1 << subsystem.bit_index()) != 0
    }

    /// Returns the full bitfield for reporting.
    #[must_use]
    pub fn read(&self) -> u8 {
        self.bits.load(Ordering::Acquire)
    }

    /// Returns a [`fmt::Display`] adapter rendering the ground-link health line.
    #[must_use]
    pub fn health_line(&self) -> HealthLine {
        HealthLine(self.read())
    }
}

/// Ground-link rendering of the bitfield: `<$` + eight binary digits + `>`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HealthLine(pub u8);

impl fmt::Display for HealthLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<${:08b}>", self.0)
    }
}
