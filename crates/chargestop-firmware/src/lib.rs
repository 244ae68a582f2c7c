//! ESP32-S3 firmware-specific modules for chargestop
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: board power bring-up, the ADC button ladder, the millisecond tick
//! task and the board pin map.

#![no_std]

pub mod app_state;
pub mod buttons;
pub mod tick;
