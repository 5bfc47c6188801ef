//! Ground-configuration debug link.
//!
//! The flight controller writes narration lines synchronously; they are queued
//! here and drained to the serial port by the ground task so a slow UART never
//! stretches the duty-cycle timing.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use flight_core::collaborators::DebugChannel;
use heapless::{String, Vec};

use crate::logging::log_ground_dropped;

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;

#[cfg(target_os = "none")]
type GroundMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type GroundMutex = NoopRawMutex;

/// Ground link baud rate.
pub const GROUND_BAUD: u32 = 19_200;

/// Longest line carried by the link, excluding the CRLF terminator.
pub const GROUND_LINE_CAPACITY: usize = 64;

/// Lines buffered between the controller and the ground task.
pub const GROUND_QUEUE_DEPTH: usize = 8;

const FRAME_CAPACITY: usize = GROUND_LINE_CAPACITY + 2;

pub type GroundLine = String<GROUND_LINE_CAPACITY>;

pub type GroundFrame = Vec<u8, FRAME_CAPACITY>;

pub type GroundChannel = Channel<GroundMutex, GroundLine, GROUND_QUEUE_DEPTH>;

pub type GroundSender<'a> = Sender<'a, GroundMutex, GroundLine, GROUND_QUEUE_DEPTH>;

pub type GroundReceiver<'a> = Receiver<'a, GroundMutex, GroundLine, GROUND_QUEUE_DEPTH>;

/// [`DebugChannel`] that enqueues lines for the ground task.
pub struct GroundLink<'a> {
    sender: GroundSender<'a>,
    dropped: u32,
}

impl<'a> GroundLink<'a> {
    pub fn new(sender: GroundSender<'a>) -> Self {
        Self { sender, dropped: 0 }
    }

    /// Lines discarded because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl DebugChannel for GroundLink<'_> {
    fn write_line(&mut self, line: &str) {
        if let Err(TrySendError::Full(_)) = self.sender.try_send(truncate_line(line)) {
            self.dropped = self.dropped.wrapping_add(1);
            log_ground_dropped(line);
        }
    }
}

/// Copies `line` into a [`GroundLine`], cutting on a char boundary when too long.
pub fn truncate_line(line: &str) -> GroundLine {
    let mut text = GroundLine::new();
    for ch in line.chars() {
        if text.push(ch).is_err() {
            break;
        }
    }
    text
}

/// Appends the CRLF terminator expected by the ground terminal.
pub fn frame_line(line: &GroundLine) -> GroundFrame {
    let mut frame = GroundFrame::new();
    // Capacity covers the longest line plus terminator.
    let _ = frame.extend_from_slice(line.as_bytes());
    let _ = frame.extend_from_slice(b"\r\n");
    frame
}
