//! STM32G0B1 peripheral adapters for the flight collaborators.

#![cfg(target_os = "none")]

pub mod adc;
pub mod flash;
pub mod indicator;
