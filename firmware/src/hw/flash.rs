//! Flash page reserved for the emulated EEPROM.

use embassy_stm32::flash::{Blocking, Flash};

use crate::storage::{DOUBLEWORD, FlashPage, StorageError};

/// Last 2 KiB page of the 512 KiB part, outside the firmware image.
const PAGE_OFFSET: u32 = 0x0007_F800;
const PAGE_SIZE: u32 = 2048;

pub struct StoragePage<'d> {
    flash: Flash<'d, Blocking>,
}

impl<'d> StoragePage<'d> {
    pub fn new(flash: Flash<'d, Blocking>) -> Self {
        Self { flash }
    }
}

fn offset_of(offset: usize) -> Result<u32, StorageError> {
    u32::try_from(offset)
        .ok()
        .and_then(|offset| PAGE_OFFSET.checked_add(offset))
        .ok_or(StorageError::Program)
}

impl FlashPage for StoragePage<'_> {
    fn read(&mut self, offset: usize, bytes: &mut [u8]) -> Result<(), StorageError> {
        let start = offset_of(offset).map_err(|_| StorageError::Read)?;
        self.flash
            .blocking_read(start, bytes)
            .map_err(|_| StorageError::Read)
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        self.flash
            .blocking_erase(PAGE_OFFSET, PAGE_OFFSET + PAGE_SIZE)
            .map_err(|_| StorageError::Erase)
    }

    fn program(&mut self, offset: usize, doubleword: &[u8; DOUBLEWORD]) -> Result<(), StorageError> {
        let start = offset_of(offset)?;
        self.flash
            .blocking_write(start, doubleword)
            .map_err(|_| StorageError::Program)
    }
}
