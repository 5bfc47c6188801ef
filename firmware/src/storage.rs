//! EEPROM emulation on one flash page.
//!
//! The STM32G0 has no data EEPROM, so a small byte image is mirrored in RAM
//! and written back to a dedicated flash page. Flash doublewords can only be
//! programmed once after an erase, so any change rewrites the whole page.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt;

use flight_core::collaborators::PersistentStorage;

use crate::logging::log_storage_fault;

/// Bytes of emulated EEPROM exposed to the flight core.
pub const STORAGE_LEN: usize = 64;

/// Flash programming granule.
pub const DOUBLEWORD: usize = 8;

/// Value of an erased flash byte.
pub const ERASED: u8 = 0xFF;

/// Failures raised by the flash backend.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StorageError {
    Read,
    Erase,
    Program,
    AddressOutOfRange(u16),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Read => f.write_str("flash read failed"),
            StorageError::Erase => f.write_str("flash page erase failed"),
            StorageError::Program => f.write_str("flash program failed"),
            StorageError::AddressOutOfRange(address) => {
                write!(f, "address {address:#06x} outside emulated EEPROM")
            }
        }
    }
}

/// One erasable flash page reserved for the EEPROM image.
pub trait FlashPage {
    fn read(&mut self, offset: usize, bytes: &mut [u8]) -> Result<(), StorageError>;

    fn erase(&mut self) -> Result<(), StorageError>;

    fn program(&mut self, offset: usize, doubleword: &[u8; DOUBLEWORD]) -> Result<(), StorageError>;
}

/// Byte-addressed storage backed by a [`FlashPage`].
pub struct EmulatedEeprom<F> {
    flash: F,
    mirror: [u8; STORAGE_LEN],
}

impl<F: FlashPage> EmulatedEeprom<F> {
    /// Loads the mirror from flash. A failed read leaves the image erased.
    pub fn load(mut flash: F) -> Self {
        let mut mirror = [ERASED; STORAGE_LEN];
        if let Err(error) = flash.read(0, &mut mirror) {
            log_storage_fault(&error);
            mirror = [ERASED; STORAGE_LEN];
        }
        Self { flash, mirror }
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn get(&self, address: u16) -> Result<u8, StorageError> {
        self.mirror
            .get(usize::from(address))
            .copied()
            .ok_or(StorageError::AddressOutOfRange(address))
    }

    /// Updates one byte. Returns `Ok(false)` when the value was already stored.
    ///
    /// The mirror only changes once the page has been rewritten, so a failed
    /// write leaves `get` reporting the previous value.
    pub fn set(&mut self, address: u16, value: u8) -> Result<bool, StorageError> {
        let mut staged = self.mirror;
        let slot = staged
            .get_mut(usize::from(address))
            .ok_or(StorageError::AddressOutOfRange(address))?;
        if *slot == value {
            return Ok(false);
        }
        *slot = value;
        self.write_back(&staged)?;
        self.mirror = staged;
        Ok(true)
    }

    fn write_back(&mut self, image: &[u8; STORAGE_LEN]) -> Result<(), StorageError> {
        self.flash.erase()?;
        for (index, chunk) in image.chunks_exact(DOUBLEWORD).enumerate() {
            if chunk.iter().all(|byte| *byte == ERASED) {
                continue;
            }
            let mut doubleword = [ERASED; DOUBLEWORD];
            doubleword.copy_from_slice(chunk);
            self.flash.program(index * DOUBLEWORD, &doubleword)?;
        }
        Ok(())
    }
}

impl<F: FlashPage> PersistentStorage for EmulatedEeprom<F> {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.get(address).unwrap_or_else(|error| {
            log_storage_fault(&error);
            ERASED
        })
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        if let Err(error) = self.set(address, value) {
            log_storage_fault(&error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flight_core::crash::{BootCheck, CRASH_FLAG_ADDRESS, CrashFlag, CrashSentinel};

    /// Page model that refuses to program a doubleword twice without an erase.
    struct PageModel {
        cells: [u8; STORAGE_LEN],
        erases: usize,
        fail_reads: bool,
        fail_erase: bool,
    }

    impl PageModel {
        fn erased() -> Self {
            Self {
                cells: [ERASED; STORAGE_LEN],
                erases: 0,
                fail_reads: false,
                fail_erase: false,
            }
        }
    }

    impl FlashPage for PageModel {
        fn read(&mut self, offset: usize, bytes: &mut [u8]) -> Result<(), StorageError> {
            if self.fail_reads {
                return Err(StorageError::Read);
            }
            bytes.copy_from_slice(&self.cells[offset..offset + bytes.len()]);
            Ok(())
        }

        fn erase(&mut self) -> Result<(), StorageError> {
            if self.fail_erase {
                return Err(StorageError::Erase);
            }
            self.cells = [ERASED; STORAGE_LEN];
            self.erases += 1;
            Ok(())
        }

        fn program(&mut self, offset: usize, doubleword: &[u8; DOUBLEWORD]) -> Result<(), StorageError> {
            let target = &mut self.cells[offset..offset + DOUBLEWORD];
            if target.iter().any(|byte| *byte != ERASED) {
                return Err(StorageError::Program);
            }
            target.copy_from_slice(doubleword);
            Ok(())
        }
    }

    #[test]
    fn writes_survive_a_reload() {
        let mut eeprom = EmulatedEeprom::load(PageModel::erased());
        eeprom.write_byte(0, 0x00);
        eeprom.write_byte(9, 0x42);

        let reloaded = EmulatedEeprom::load(PageModel {
            cells: eeprom.flash().cells,
            erases: 0,
            fail_reads: false,
            fail_erase: false,
        });
        assert_eq!(reloaded.get(0), Ok(0x00));
        assert_eq!(reloaded.get(9), Ok(0x42));
        assert_eq!(reloaded.get(10), Ok(ERASED));
    }

    #[test]
    fn unchanged_value_skips_the_erase() {
        let mut eeprom = EmulatedEeprom::load(PageModel::erased());
        assert_eq!(eeprom.set(3, 0x11), Ok(true));
        assert_eq!(eeprom.set(3, 0x11), Ok(false));
        assert_eq!(eeprom.flash().erases, 1);
    }

    #[test]
    fn failed_write_keeps_the_stored_value() {
        let mut eeprom = EmulatedEeprom::load(PageModel::erased());
        assert_eq!(eeprom.set(5, 0x00), Ok(true));

        eeprom.flash.fail_erase = true;
        assert_eq!(eeprom.set(5, 0x7A), Err(StorageError::Erase));
        assert_eq!(eeprom.get(5), Ok(0x00));
        eeprom.write_byte(5, 0x7A);
        assert_eq!(eeprom.read_byte(5), 0x00);

        eeprom.flash.fail_erase = false;
        assert_eq!(eeprom.set(5, 0x7A), Ok(true));
        assert_eq!(eeprom.get(5), Ok(0x7A));
        assert_eq!(eeprom.flash().cells[5], 0x7A);
    }

    #[test]
    fn out_of_range_reads_as_erased() {
        let mut eeprom = EmulatedEeprom::load(PageModel::erased());
        assert_eq!(eeprom.get(64), Err(StorageError::AddressOutOfRange(64)));
        assert_eq!(eeprom.read_byte(64), ERASED);
    }

    #[test]
    fn unreadable_page_loads_as_erased() {
        let mut page = PageModel::erased();
        page.cells[0] = 0x00;
        page.fail_reads = true;
        let eeprom = EmulatedEeprom::load(page);
        assert_eq!(eeprom.get(0), Ok(ERASED));
    }

    #[test]
    fn crash_flag_round_trips_through_flash() {
        let mut page = PageModel::erased();
        page.cells[usize::from(CRASH_FLAG_ADDRESS)] = CrashSentinel::Clear.to_raw();
        let mut eeprom = EmulatedEeprom::load(page);

        assert_eq!(CrashFlag::new(&mut eeprom).check_and_arm(), BootCheck::Armed);
        assert_eq!(eeprom.get(CRASH_FLAG_ADDRESS), Ok(CrashSentinel::Set.to_raw()));
        assert!(matches!(
            CrashFlag::new(&mut eeprom).check_and_arm(),
            BootCheck::DirtyRestart { .. }
        ));
    }
}
