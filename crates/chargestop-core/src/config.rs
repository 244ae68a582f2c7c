//! Tunable constants of the control loop.
//!
//! Boards override these through [`ControllerConfig`].

/// Fixed period of one measurement cycle.
pub const DEFAULT_CYCLE_PERIOD_MS: u32 = 125;

/// How long the current must stay below the mA limit before charging stops.
pub const DEFAULT_DWELL_WINDOW_MS: u32 = 5_000;

/// Saturation point of the charge timer in seconds (9:59:59).
pub const DEFAULT_DURATION_CAP_SECS: u32 = 35_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Target period of one control cycle in milliseconds
    pub cycle_period_ms: u32,
    /// Hysteresis window of the current-droop limit
    pub dwell_window_ms: u32,
    /// Charge time clamp applied before minute conversion and display
    pub duration_cap_secs: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: DEFAULT_CYCLE_PERIOD_MS,
            dwell_window_ms: DEFAULT_DWELL_WINDOW_MS,
            duration_cap_secs: DEFAULT_DURATION_CAP_SECS,
        }
    }
}
