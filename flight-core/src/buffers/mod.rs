//! Inbound/outbound message buffers owned by the flight core.
//!
//! Sizes match the Iridium SBD maxima (270 B mobile-terminated, 340 B
//! mobile-originated). Collaborators only ever see these through a borrow
//! scoped to one exchange.

use crate::collaborators::{SampleSet, SensorSample};

/// Capacity of the buffer receiving gateway messages.
pub const INBOUND_CAPACITY: usize = 270;

/// Capacity of the buffer staged for transmission.
pub const OUTBOUND_CAPACITY: usize = 340;

/// Size of one staged sample record.
pub const SAMPLE_RECORD_LEN: usize = 6;

/// Offset of the first sample record (after status byte and count).
pub const RECORD_OFFSET: usize = 2;

const RECORD_OK: u8 = 0x00;
const RECORD_FAULT: u8 = 0xFF;

/// Fixed-size message buffers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlightBuffers {
    inbound: [u8; INBOUND_CAPACITY],
    inbound_len: usize,
    outbound: [u8; OUTBOUND_CAPACITY],
    outbound_len: usize,
}

impl FlightBuffers {
    /// Zero-filled buffers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inbound: [0; INBOUND_CAPACITY],
            inbound_len: 0,
            outbound: [0; OUTBOUND_CAPACITY],
            outbound_len: 0,
        }
    }

    /// Zero-fills both buffers.
    pub fn clear(&mut self) {
        self.inbound.fill(0);
        self.inbound_len = 0;
        self.outbound.fill(0);
        self.outbound_len = 0;
    }

    /// Writes the status byte and sample records into the outbound buffer.
    ///
    /// Layout: `[status][count]` then one `[channel][0x00|0xFF][i32 LE]` record
    /// per sample; the rest of the buffer is zeroed. Returns the staged length.
    pub fn stage_samples(&mut self, status: u8, samples: &SampleSet) -> usize {
        self.outbound.fill(0);
        self.outbound[0] = status;

        let mut count = 0u8;
        let mut offset = RECORD_OFFSET;
        for sample in samples {
            let Some(record) = self.outbound.get_mut(offset..offset + SAMPLE_RECORD_LEN) else {
                break;
            };
            encode_record(sample, record);
            offset += SAMPLE_RECORD_LEN;
            count += 1;
        }
        self.outbound[1] = count;
        self.outbound_len = offset;
        offset
    }

    /// Bytes staged for the next exchange.
    #[must_use]
    pub fn outbound(&self) -> &[u8] {
        &self.outbound[..self.outbound_len]
    }

    /// Last message received from the gateway.
    #[must_use]
    pub fn inbound(&self) -> &[u8] {
        &self.inbound[..self.inbound_len]
    }

    /// Splits the buffers for one exchange: staged outbound bytes and the full inbound space.
    pub fn exchange_view(&mut self) -> (&[u8], &mut [u8]) {
        (&self.outbound[..self.outbound_len], &mut self.inbound[..])
    }

    /// Records how many inbound bytes the last exchange produced.
    pub fn set_inbound_len(&mut self, len: usize) {
        self.inbound_len = len.min(INBOUND_CAPACITY);
    }

    #[must_use]
    pub fn is_zeroed(&self) -> bool {
        self.inbound.iter().chain(self.outbound.iter()).all(|byte| *byte == 0)
    }
}

impl Default for FlightBuffers {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_record(sample: &SensorSample, record: &mut [u8]) {
    record[0] = sample.channel().code();
    match sample {
        SensorSample::Reading { value, .. } => {
            record[1] = RECORD_OK;
            record[2..6].copy_from_slice(&value.to_le_bytes());
        }
        SensorSample::Fault { fault, .. } => {
            record[1] = RECORD_FAULT;
            record[2..6].copy_from_slice(&i32::from(fault.code()).to_le_bytes());
        }
    }
}
