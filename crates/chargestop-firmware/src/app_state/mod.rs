//! Board constants and hardware bring-up
//!
//! Re-exports the controller types from `chargestop_core` alongside the
//! ESP32-specific initialization.

mod hardware;

pub use hardware::*;

pub use chargestop_core::session::ChargeController;

/// I2C bus speed shared by the INA219, AXP2101 and AW9523.
pub const I2C_FREQUENCY_KHZ: u32 = 400;

/// AW9523 IO expander address.
pub const GPIO_EXPANDER_ADDRESS: u8 = 0x58;

/// Start of the 4 KiB flash sector holding the settings record (NVS partition).
pub const SETTINGS_FLASH_OFFSET: u32 = 0x9000;

pub const DISPLAY_WIDTH: u16 = 320;
pub const DISPLAY_HEIGHT: u16 = 240;
