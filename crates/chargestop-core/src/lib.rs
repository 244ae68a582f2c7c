//! Hardware-independent core library for chargestop
//!
//! This crate contains the platform-agnostic part of the USB charge limiter:
//! the millisecond clock, the INA219 power sensor driver, charge/energy
//! integration, the four stop policies, the per-cycle session controller,
//! settings persistence and the text screen.
//!
//! It is `#![no_std]` so it compiles on both the embedded target (ESP32-S3)
//! and desktop hosts (for the simulator and tests).

#![no_std]

pub mod accumulator;
pub mod async_i2c_bus;
pub mod buttons;
pub mod clock;
pub mod config;
pub mod display;
pub mod limits;
pub mod policy;
pub mod sensors;
pub mod session;
pub mod settings;
