#![no_std]

// Shared flight logic for the JagSat balloon flight computer.
//
// This crate stays portable across the MCU firmware and the host emulator by
// avoiding the Rust standard library. Hardware is reached only through the
// collaborator traits so the same duty-cycle logic runs on both targets.

pub mod boot;
pub mod buffers;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod crash;
pub mod health;
pub mod lifecycle;
pub mod readiness;
pub mod status;
pub mod telemetry;
