//! Hardware initialization for the chargestop board
//!
//! The INA219, the AXP2101 power-management chip and the AW9523 IO expander
//! all hang off I2C0. The bus is placed in a static async mutex and each chip
//! receives its own [`SharedI2cDevice`] handle.

use axp2101_embedded::AsyncAxp2101;
use chargestop_core::async_i2c_bus::{SharedI2cBus, SharedI2cDevice};
use chargestop_core::sensors::{INA219_DEFAULT_ADDRESS, Ina219};
use embassy_sync::mutex::Mutex;
use esp_hal::{i2c::master::Config as I2cConfig, time::Rate};
use log::{error, info};
use static_cell::StaticCell;

use super::{GPIO_EXPANDER_ADDRESS, I2C_FREQUENCY_KHZ};

pub type BoardI2c = esp_hal::i2c::master::I2c<'static, esp_hal::Async>;
pub type BoardI2cDevice = SharedI2cDevice<'static, BoardI2c>;

/// Chips on the shared bus that stay alive for the lifetime of the firmware.
pub struct I2cHardware {
    pub power_mgmt: AsyncAxp2101<BoardI2cDevice>,
    pub gpio_expander:
        aw9523_embedded::r#async::Aw9523Async<embedded_hal::i2c::SevenBitAddress, BoardI2cDevice>,
}

/// Create the I2C0 peripheral on the board's SDA/SCL pins.
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO12<'static>,
    scl: esp_hal::peripherals::GPIO11<'static>,
) -> BoardI2c {
    esp_hal::i2c::master::I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    )
    .expect("I2C0 configuration rejected")
    .with_sda(sda)
    .with_scl(scl)
    .into_async()
}

/// Bring up the power rails and IO expander, and hand back the INA219.
///
/// Power-management failures are logged rather than fatal: the sensor and
/// output enable still work on USB power alone.
pub async fn init_i2c_hardware(i2c0: BoardI2c) -> (I2cHardware, Ina219<BoardI2cDevice>) {
    static I2C0_BUS: StaticCell<SharedI2cBus<BoardI2c>> = StaticCell::new();
    let bus = I2C0_BUS.init(Mutex::new(i2c0));

    info!("Configuring power management");
    let mut power_mgmt = AsyncAxp2101::new(SharedI2cDevice::new(bus));
    match power_mgmt.init().await {
        Ok(_) => info!("Power management ready"),
        Err(e) => error!("Power init failed: {:?}", e),
    }
    // ALDO4 feeds the display at 3.3 V
    if let Err(e) = power_mgmt.enable_aldo4().await {
        error!("Failed to enable display rail: {:?}", e);
    }
    if let Err(e) = power_mgmt.set_aldo4_voltage(3300).await {
        error!("Failed to set display rail voltage: {:?}", e);
    }

    info!("Configuring GPIO expander");
    let mut gpio_expander =
        aw9523_embedded::r#async::Aw9523Async::new(SharedI2cDevice::new(bus), GPIO_EXPANDER_ADDRESS);
    if let Err(e) = gpio_expander.init().await {
        error!("GPIO expander init failed: {:?}", e);
    }

    let sensor = Ina219::new(SharedI2cDevice::new(bus), INA219_DEFAULT_ADDRESS);

    (
        I2cHardware {
            power_mgmt,
            gpio_expander,
        },
        sensor,
    )
}
