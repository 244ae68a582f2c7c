//! Desktop simulator for the chargestop USB charge limiter.
//!
//! Runs the real [`ChargeController`] in an SDL2 window via
//! `embedded-graphics-simulator`, against a simulated battery that draws a
//! constant current until nearly full and then tapers off.
//!
//! # Key bindings
//!
//! | Key          | Button            |
//! |--------------|-------------------|
//! | S            | SELECT            |
//! | Up           | INCREASE (hold)   |
//! | Down         | DECREASE (hold)   |
//! | Space, Enter | START / PAUSE     |
//! | R            | Reset all values  |
//! | Q, Esc       | Quit              |
//!
//! Settings persist in `chargestop-settings.bin` in the system temp directory
//! (override with `CHARGESTOP_SETTINGS`).

use std::cell::Cell;
use std::convert::Infallible;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use embedded_hal::digital::{ErrorType, OutputPin};
use log::{info, warn};

use chargestop_core::buttons::{Button, ButtonInput};
use chargestop_core::clock::TickClock;
use chargestop_core::config::ControllerConfig;
use chargestop_core::display::TextScreen;
use chargestop_core::sensors::{PowerReading, PowerSensor, SensorError};
use chargestop_core::session::ChargeController;
use chargestop_core::settings::{
    RECORD_CAPACITY, Settings, SettingsError, SettingsStore, decode_record, encode_record,
};

// ---------------------------------------------------------------------------
// Display constants
// ---------------------------------------------------------------------------

const DISPLAY_WIDTH_PX: u32 = 320;
const DISPLAY_HEIGHT_PX: u32 = 240;

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 2;

// ---------------------------------------------------------------------------
// Simulated hardware
// ---------------------------------------------------------------------------

static CLOCK: TickClock = TickClock::new();

/// Feeds the tick clock from wall time.
///
/// A 1 ms `sleep` routinely oversleeps, so each wake issues every tick that
/// has come due since `origin` instead of a single one.
struct WallClockTicker {
    origin: Instant,
    ticks: u32,
}

impl WallClockTicker {
    fn new(origin: Instant) -> Self {
        Self { origin, ticks: 0 }
    }

    fn catch_up(&mut self, clock: &TickClock) {
        let due = self.origin.elapsed().as_millis() as u32;
        while self.ticks != due {
            clock.on_tick();
            self.ticks = self.ticks.wrapping_add(1);
        }
    }
}

/// Capacity of the simulated battery; small so a full charge takes minutes.
const BATTERY_CAPACITY_MAH: f64 = 60.0;
const CONSTANT_CURRENT_MA: f64 = 1_200.0;
/// State of charge where constant current turns into the taper.
const TAPER_START: f64 = 0.8;

/// Battery behind the load switch.
struct SimulatedLoad {
    enabled: Rc<Cell<bool>>,
    state_of_charge: f64,
    last_read: Instant,
}

impl SimulatedLoad {
    fn new(enabled: Rc<Cell<bool>>) -> Self {
        Self {
            enabled,
            state_of_charge: 0.2,
            last_read: Instant::now(),
        }
    }

    fn current_ma(&self) -> f64 {
        if !self.enabled.get() || self.state_of_charge >= 1.0 {
            0.0
        } else if self.state_of_charge < TAPER_START {
            CONSTANT_CURRENT_MA
        } else {
            let remaining = (1.0 - self.state_of_charge) / (1.0 - TAPER_START);
            CONSTANT_CURRENT_MA * remaining
        }
    }
}

impl PowerSensor for SimulatedLoad {
    async fn read(&mut self) -> Result<PowerReading, SensorError> {
        let dt_hours = self.last_read.elapsed().as_secs_f64() / 3_600.0;
        self.last_read = Instant::now();

        let current_ma = self.current_ma();
        self.state_of_charge =
            (self.state_of_charge + current_ma * dt_hours / BATTERY_CAPACITY_MAH).min(1.0);

        // Cable and switch resistance of ~0.15 Ω
        let voltage_mv = 5_100.0 - current_ma * 0.15;

        Ok(PowerReading {
            voltage_mv: voltage_mv as u16,
            current_ma: current_ma as u16,
        })
    }
}

/// Load switch; shares its state with the simulated battery.
struct SimOutput(Rc<Cell<bool>>);

impl ErrorType for SimOutput {
    type Error = Infallible;
}

impl OutputPin for SimOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

/// Settings record stored in a file, in the same format as on flash.
struct FileSettingsStore {
    path: PathBuf,
}

impl SettingsStore for FileSettingsStore {
    fn load(&mut self) -> Result<Option<Settings>, SettingsError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(decode_record(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!("Cannot read {}: {}", self.path.display(), e);
                Err(SettingsError::Unavailable)
            }
        }
    }

    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        let mut buf = [0u8; RECORD_CAPACITY];
        let len = encode_record(settings, &mut buf)?;
        std::fs::write(&self.path, &buf[..len]).map_err(|e| {
            warn!("Cannot write {}: {}", self.path.display(), e);
            SettingsError::Unavailable
        })
    }
}

/// Keyboard keys standing in for the resistor ladder.
#[derive(Default)]
struct KeyboardButtons {
    held: Option<Button>,
}

impl ButtonInput for KeyboardButtons {
    fn poll(&mut self) -> Button {
        self.held.unwrap_or(Button::None)
    }
}

fn keycode_to_button(keycode: Keycode) -> Option<Button> {
    match keycode {
        Keycode::S => Some(Button::Select),
        Keycode::Up => Some(Button::Increase),
        Keycode::Down => Some(Button::Decrease),
        Keycode::Space | Keycode::Return => Some(Button::Start),
        _ => None,
    }
}

fn settings_path() -> PathBuf {
    std::env::var_os("CHARGESTOP_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("chargestop-settings.bin"))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting chargestop simulator");
    info!("Keys: S=Select  Up/Down=Adjust  Space=Start/Pause  R=Reset  Q=Quit");

    std::thread::spawn(|| {
        let mut ticker = WallClockTicker::new(Instant::now());
        loop {
            std::thread::sleep(Duration::from_millis(1));
            ticker.catch_up(&CLOCK);
        }
    });

    let display = SimulatorDisplay::<Rgb565>::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX));
    let mut screen = TextScreen::new(display);
    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("chargestop Simulator", &output_settings);

    let output_enabled = Rc::new(Cell::new(false));
    let path = settings_path();
    info!("Settings file: {}", path.display());

    let config = ControllerConfig::default();
    let mut controller = ChargeController::new(
        SimulatedLoad::new(output_enabled.clone()),
        SimOutput(output_enabled),
        FileSettingsStore { path },
        &CLOCK,
        config,
    );
    let mut buttons = KeyboardButtons::default();
    let cycle_period = Duration::from_millis(config.cycle_period_ms as u64);

    // The SDL window is lazily initialized on the first `update()` call.
    let _ = screen.target_mut().clear(Rgb565::BLACK);
    window.update(screen.target());

    'running: loop {
        let cycle_start = Instant::now();

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,

                SimulatorEvent::KeyDown {
                    keycode, repeat, ..
                } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        break 'running;
                    }
                    if keycode == Keycode::R && !repeat {
                        controller.reset_all();
                    }
                    if let Some(button) = keycode_to_button(keycode) {
                        buttons.held = Some(button);
                    }
                }

                SimulatorEvent::KeyUp { keycode, .. } => {
                    if keycode_to_button(keycode).is_some_and(|b| buttons.held == Some(b)) {
                        buttons.held = None;
                    }
                }

                _ => {}
            }
        }

        let report = block_on(controller.run_cycle(&mut buttons, &mut screen));
        if let Some(kind) = report.stopped_by {
            info!(
                "Charging stopped by {:?} limit after {} mAh / {} mWh",
                kind,
                report.totals.capacity_mah(),
                report.totals.energy_mwh()
            );
        }

        window.update(screen.target());

        let elapsed = cycle_start.elapsed();
        if elapsed < cycle_period {
            std::thread::sleep(cycle_period - elapsed);
        }
    }

    info!("Simulator exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargestop_core::clock::Clock;

    #[test]
    fn test_ticker_catches_up_missed_ticks() {
        let clock = TickClock::new();
        let origin = Instant::now()
            .checked_sub(Duration::from_millis(250))
            .unwrap();
        let mut ticker = WallClockTicker::new(origin);

        ticker.catch_up(&clock);

        let now = clock.now_ms();
        assert!(now >= 250, "clock at {} ms", now);
        assert_eq!(now, ticker.ticks);
    }

    #[test]
    fn test_ticker_tracks_wall_time_across_wakes() {
        let clock = TickClock::new();
        let origin = Instant::now();
        let mut ticker = WallClockTicker::new(origin);

        for _ in 0..20 {
            std::thread::sleep(Duration::from_millis(3));
            ticker.catch_up(&clock);
        }

        let wall_ms = origin.elapsed().as_millis() as u32;
        let now = clock.now_ms();
        // Twenty wakes at 3 ms or more each; one tick per wake would read 20.
        assert!(now >= 60, "clock at {} ms", now);
        assert!(now <= wall_ms, "clock {} ahead of wall {}", now, wall_ms);
    }
}
