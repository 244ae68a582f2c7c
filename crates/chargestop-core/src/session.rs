//! Session controller
//!
//! [`ChargeController`] owns every piece of mutable state of the device and
//! advances it one fixed-period cycle at a time:
//!
//! 1. take a [`Sample`] (sensor + clock)
//! 2. integrate it over the time since the previous cycle
//! 3. while charging, evaluate the active limit and cut the output on a stop
//! 4. handle one button reading
//! 5. redraw the screen
//!
//! Settings are written to the store only when charging starts or stops.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, trace, warn};

use crate::accumulator::{Accumulator, Totals};
use crate::buttons::{Button, ButtonEdge, ButtonInput};
use crate::clock::{Clock, elapsed_ms};
use crate::config::ControllerConfig;
use crate::display::screen::{self, ScreenView};
use crate::display::{DisplayMode, DisplaySink};
use crate::limits::{LimitKind, LimitTable};
use crate::policy::should_stop;
use crate::sensors::{PowerReading, PowerSensor, Sample};
use crate::settings::{Settings, SettingsStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Paused,
    Charging,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub selected: LimitKind,
    pub display_mode: DisplayMode,
    pub run_state: RunState,
    /// Only consulted by the current-droop limit
    pub dwell_deadline_ms: u32,
}

/// Outcome of one control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub sample: Sample,
    pub totals: Totals,
    pub run_state: RunState,
    /// Set on the cycle a limit cut the output
    pub stopped_by: Option<LimitKind>,
}

pub struct ChargeController<S, O, P, C> {
    sensor: S,
    output: O,
    store: P,
    clock: C,
    config: ControllerConfig,
    limits: LimitTable,
    state: SessionState,
    accumulator: Accumulator,
    buttons: ButtonEdge,
    last_now_ms: u32,
}

impl<S, O, P, C> ChargeController<S, O, P, C>
where
    S: PowerSensor,
    O: OutputPin,
    P: SettingsStore,
    C: Clock,
{
    /// Restore settings (or write defaults) and start paused with the output off.
    pub fn new(sensor: S, output: O, store: P, clock: C, config: ControllerConfig) -> Self {
        let last_now_ms = clock.now_ms();
        let mut controller = Self {
            sensor,
            output,
            store,
            clock,
            config,
            limits: LimitTable::default(),
            state: SessionState::default(),
            accumulator: Accumulator::new(),
            buttons: ButtonEdge::new(),
            last_now_ms,
        };

        controller.set_output(false);

        match controller.store.load() {
            Ok(Some(settings)) => {
                info!(
                    "Settings restored: {:?} limit, values {:?}",
                    settings.selected, settings.limit_values
                );
                controller.apply_settings(&settings);
            }
            Ok(None) => {
                info!("No valid settings stored, writing defaults");
                controller.persist();
            }
            Err(e) => {
                error!("Settings load failed: {}", e);
                controller.persist();
            }
        }

        controller
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn limits(&self) -> &LimitTable {
        &self.limits
    }

    pub fn totals(&self) -> &Totals {
        self.accumulator.totals()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn is_charging(&self) -> bool {
        self.state.run_state == RunState::Charging
    }

    /// Current settings as they would be persisted.
    pub fn settings(&self) -> Settings {
        Settings {
            limit_values: self.limits.values(),
            selected: self.state.selected,
            display_mode: self.state.display_mode,
        }
    }

    /// Execute one control cycle.
    pub async fn run_cycle<B, D>(&mut self, buttons: &mut B, display: &mut D) -> CycleReport
    where
        B: ButtonInput,
        D: DisplaySink,
    {
        let reading = match self.sensor.read().await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("{}; using a zero sample this cycle", e);
                PowerReading::default()
            }
        };
        let now = self.clock.now_ms();
        let sample = Sample::new(reading, now);

        let elapsed = elapsed_ms(self.last_now_ms, now);
        self.last_now_ms = now;

        let charging = self.is_charging();
        let totals = self.accumulator.integrate(&sample, elapsed, charging);
        trace!(
            "t={} dt={} {}mV {}mA -> {}uAh {}uWh {}ms",
            now,
            elapsed,
            sample.voltage_mv,
            sample.current_ma,
            totals.capacity_uah,
            totals.energy_uwh,
            totals.charge_duration_ms
        );

        let mut stopped_by = None;
        if charging {
            let kind = self.state.selected;
            let limit = self.limits.value(kind);
            let decision = should_stop(
                kind,
                limit,
                &totals,
                &sample,
                now,
                self.state.dwell_deadline_ms,
                &self.config,
            );
            self.state.dwell_deadline_ms = decision.dwell_deadline_ms;

            if decision.stop {
                info!("{} limit of {} {} reached", kind.label(), limit, kind.unit());
                self.stop_charging();
                stopped_by = Some(kind);
            }
        }

        self.handle_button(buttons.poll());
        self.render(display, &sample);

        CycleReport {
            sample,
            totals,
            run_state: self.state.run_state,
            stopped_by,
        }
    }

    /// Run cycles forever, padding each one out to `cycle_period_ms`.
    pub async fn run<B, D, W>(&mut self, buttons: &mut B, display: &mut D, delay: &mut W) -> !
    where
        B: ButtonInput,
        D: DisplaySink,
        W: DelayNs,
    {
        if let Err(e) = display.clear() {
            error!("Display clear failed: {:?}", e);
        }

        loop {
            let started = self.clock.now_ms();
            self.run_cycle(buttons, display).await;

            let spent = elapsed_ms(started, self.clock.now_ms());
            match self.config.cycle_period_ms.checked_sub(spent) {
                Some(remaining) if remaining > 0 => delay.delay_ms(remaining).await,
                _ => debug!("Cycle overran its period ({} ms)", spent),
            }
        }
    }

    /// Stop charging, zero the totals and go back to factory limits.
    pub fn reset_all(&mut self) {
        info!("Resetting all values");
        self.set_output(false);
        self.state = SessionState::default();
        self.limits = LimitTable::default();
        self.accumulator.reset();
        self.persist();
    }

    fn handle_button(&mut self, reading: Button) {
        let press = self.buttons.update(reading);
        let paused = !self.is_charging();

        match press.button {
            Button::Select if press.is_new_press => {
                if paused {
                    self.state.selected = self.state.selected.next();
                    debug!("Selected {:?} limit", self.state.selected);
                } else {
                    self.state.display_mode = self.state.display_mode.next();
                    debug!("Display mode {:?}", self.state.display_mode);
                }
            }
            Button::Start if press.is_new_press => {
                if paused {
                    self.start_charging();
                } else {
                    info!("Charging paused by user");
                    self.stop_charging();
                }
            }
            // Level triggered: repeats every cycle the button is held.
            Button::Increase if paused => self.limits.increase(self.state.selected),
            Button::Decrease if paused => self.limits.decrease(self.state.selected),
            _ => {}
        }
    }

    fn start_charging(&mut self) {
        self.set_output(true);
        self.state.run_state = RunState::Charging;
        self.state.dwell_deadline_ms = self.last_now_ms.wrapping_add(self.config.dwell_window_ms);
        info!(
            "Charging started, {:?} limit {}",
            self.state.selected,
            self.limits.value(self.state.selected)
        );
        self.persist();
    }

    fn stop_charging(&mut self) {
        self.set_output(false);
        self.state.run_state = RunState::Paused;
        self.persist();
    }

    fn apply_settings(&mut self, settings: &Settings) {
        self.limits = LimitTable::from_values(settings.limit_values);
        self.state.selected = settings.selected;
        self.state.display_mode = settings.display_mode;
    }

    fn persist(&mut self) {
        let settings = self.settings();
        match self.store.save(&settings) {
            Ok(()) => debug!("Settings saved"),
            Err(e) => error!("Failed to save settings: {}", e),
        }
    }

    fn set_output(&mut self, enabled: bool) {
        let result = if enabled {
            self.output.set_high()
        } else {
            self.output.set_low()
        };
        if let Err(e) = result {
            error!("Failed to switch output {}: {:?}", if enabled { "on" } else { "off" }, e);
        }
    }

    fn render<D: DisplaySink>(&self, display: &mut D, sample: &Sample) {
        let totals = self.accumulator.totals();
        let view = ScreenView {
            selected: self.state.selected,
            limit_value: self.limits.value(self.state.selected),
            is_charging: self.is_charging(),
            display_mode: self.state.display_mode,
            voltage_mv: sample.voltage_mv,
            current_ma: sample.current_ma,
            capacity_mah: totals.capacity_mah(),
            energy_mwh: totals.energy_mwh(),
            charge_secs: totals.charge_secs(self.config.duration_cap_secs),
        };

        if let Err(e) = screen::render(display, &view) {
            error!("Display update failed: {:?}", e);
        }
    }
}
