//! Persistent crash-recovery flag.
//!
//! One byte at a fixed storage address distinguishes a clean boot from a
//! restart after an ungraceful reset. Flight boots arm the flag (write SET);
//! a future graceful shutdown would clear it. Nothing on the boot path clears
//! the flag today, and finding it SET only records the fact: the recovery
//! action itself is an explicit, inert [`RecoveryAction::NotImplemented`].

use crate::collaborators::PersistentStorage;

/// Storage address holding the flag sentinel.
pub const CRASH_FLAG_ADDRESS: u16 = 0x0000;

/// Persisted sentinel values.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CrashSentinel {
    Set,
    Clear,
}

impl CrashSentinel {
    const SET_BYTE: u8 = 0xFF;
    const CLEAR_BYTE: u8 = 0x00;

    /// Encodes the sentinel into its stored byte.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            CrashSentinel::Set => Self::SET_BYTE,
            CrashSentinel::Clear => Self::CLEAR_BYTE,
        }
    }
}

/// Interpretation of the stored flag.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CrashState {
    /// Flag not SET: previous session shut down cleanly (or never armed).
    Clean,
    /// Flag SET: previous session did not shut down gracefully.
    DirtyRestart,
}

impl CrashState {
    /// Only the exact SET byte counts as dirty; any other value reads clean.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        if raw == CrashSentinel::SET_BYTE {
            CrashState::DirtyRestart
        } else {
            CrashState::Clean
        }
    }
}

/// Action taken after detecting a dirty restart.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecoveryAction {
    /// Recovery flow does not exist yet; detection is recorded and boot continues.
    NotImplemented,
}

/// Result of the boot-time crash check.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootCheck {
    /// Flag was clear and has now been armed.
    Armed,
    /// Flag was already SET when the system booted.
    DirtyRestart { recovery: RecoveryAction },
    /// Crash handling is disabled for this configuration.
    Skipped,
}

/// Accessor for the crash flag byte in persistent storage.
#[derive(Debug)]
pub struct CrashFlag<'a, S: PersistentStorage> {
    storage: &'a mut S,
}

impl<'a, S: PersistentStorage> CrashFlag<'a, S> {
    pub fn new(storage: &'a mut S) -> Self {
        Self { storage }
    }

    /// Interprets the stored byte.
    pub fn read_flag(&mut self) -> CrashState {
        CrashState::from_raw(self.storage.read_byte(CRASH_FLAG_ADDRESS))
    }

    /// Persists a sentinel.
    pub fn write_flag(&mut self, sentinel: CrashSentinel) {
        self.storage
            .write_byte(CRASH_FLAG_ADDRESS, sentinel.to_raw());
    }

    /// Marks the current session as shut down cleanly.
    pub fn clear(&mut self) {
        self.write_flag(CrashSentinel::Clear);
    }

    /// Boot-time check: detect a dirty restart, otherwise arm the flag.
    ///
    /// Performs at most one storage write per call.
    pub fn check_and_arm(&mut self) -> BootCheck {
        match self.read_flag() {
            CrashState::DirtyRestart => BootCheck::DirtyRestart {
                recovery: attempt_recovery(),
            },
            CrashState::Clean => {
                self.write_flag(CrashSentinel::Set);
                BootCheck::Armed
            }
        }
    }
}

fn attempt_recovery() -> RecoveryAction {
    RecoveryAction::NotImplemented
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingStorage {
        bytes: [u8; 4],
        writes: usize,
    }

    impl CountingStorage {
        fn with_flag(raw: u8) -> Self {
            Self {
                bytes: [raw, 0xAA, 0xAA, 0xAA],
                writes: 0,
            }
        }
    }

    impl PersistentStorage for CountingStorage {
        fn read_byte(&mut self, address: u16) -> u8 {
            self.bytes[usize::from(address)]
        }

        fn write_byte(&mut self, address: u16, value: u8) {
            self.writes += 1;
            self.bytes[usize::from(address)] = value;
        }
    }

    #[test]
    fn clean_flag_is_armed_with_a_single_write() {
        let mut storage = CountingStorage::with_flag(0x00);
        let check = CrashFlag::new(&mut storage).check_and_arm();

        assert_eq!(check, BootCheck::Armed);
        assert_eq!(storage.writes, 1);
        assert_eq!(storage.bytes[0], 0xFF);
        assert_eq!(&storage.bytes[1..], &[0xAA; 3]);
    }

    #[test]
    fn set_flag_reports_dirty_restart_without_writing() {
        let mut storage = CountingStorage::with_flag(0xFF);
        let check = CrashFlag::new(&mut storage).check_and_arm();

        assert_eq!(
            check,
            BootCheck::DirtyRestart {
                recovery: RecoveryAction::NotImplemented
            }
        );
        assert_eq!(storage.writes, 0);
    }

    #[test]
    fn only_the_set_sentinel_reads_dirty() {
        assert_eq!(CrashState::from_raw(0xFF), CrashState::DirtyRestart);
        assert_eq!(CrashState::from_raw(0x00), CrashState::Clean);
        assert_eq!(CrashState::from_raw(0x5A), CrashState::Clean);
    }

    #[test]
    fn clear_restores_clean_state() {
        let mut storage = CountingStorage::with_flag(0xFF);
        let mut flag = CrashFlag::new(&mut storage);
        flag.clear();
        assert_eq!(flag.read_flag(), CrashState::Clean);
        assert_eq!(storage.bytes[0], 0x00);
    }
}
