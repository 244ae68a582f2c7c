#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use chargestop_core::buttons::{Button, ButtonInput};
use chargestop_core::config::ControllerConfig;
use chargestop_core::display::TextScreen;
use chargestop_core::settings::FlashSettingsStore;
use chargestop_firmware::app_state::{
    ChargeController, DISPLAY_HEIGHT, DISPLAY_WIDTH, SETTINGS_FLASH_OFFSET, create_i2c_bus,
    init_i2c_hardware,
};
use chargestop_firmware::buttons::AdcButtons;
use chargestop_firmware::tick::{CLOCK, clock_tick_task};
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::timer::timg::TimerGroup;
use esp_storage::FlashStorage;
use log::info;

// Display-LCD panel specific imports
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::spi::master::{Config, Spi};
use mipidsi::interface::SpiInterface;
use mipidsi::{Builder as MipidsiBuilder, models::ILI9342CRgb565};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // The load switch must be off before anything else happens.
    let output_enable = Output::new(peripherals.GPIO10, Level::Low, OutputConfig::default());

    spawner.spawn(clock_tick_task().expect("clock tick task already spawned"));
    info!("Embassy initialized, clock running");

    let i2c0 = create_i2c_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11);
    let (_board, sensor) = init_i2c_hardware(i2c0).await;

    // 1. Configure SPI bus
    let spi_bus = Spi::new(peripherals.SPI2, Config::default())
        .expect("SPI2 configuration rejected")
        .with_sck(peripherals.GPIO36)
        .with_mosi(peripherals.GPIO37);

    // 2. The panel has no hardware CS line wired to the SPI peripheral
    let cs = Output::new(peripherals.GPIO35, Level::High, OutputConfig::default());
    let spi_device = ExclusiveDevice::new_no_delay(spi_bus, cs).expect("SPI device setup failed");

    // 3. Data/Command select
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());

    // 4. Batching buffer for SPI writes
    let mut spi_buffer = [0u8; 64];
    let di = SpiInterface::new(spi_device, dc, &mut spi_buffer);

    let display = MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .init(&mut embassy_time::Delay)
        .expect("Failed to initialize display");
    let mut screen = TextScreen::new(display);
    info!("Display initialized");

    let mut buttons = AdcButtons::new(peripherals.ADC1, peripherals.GPIO1);
    let store = FlashSettingsStore::new(FlashStorage::new(peripherals.FLASH), SETTINGS_FLASH_OFFSET);

    let mut controller = ChargeController::new(
        sensor,
        output_enable,
        store,
        &CLOCK,
        ControllerConfig::default(),
    );

    if buttons.poll() == Button::Select {
        info!("SELECT held at power on");
        controller.reset_all();
        // The held key must not count as a first press.
        while buttons.poll() == Button::Select {
            Timer::after(Duration::from_millis(20)).await;
        }
    }

    controller
        .run(&mut buttons, &mut screen, &mut embassy_time::Delay)
        .await
}
