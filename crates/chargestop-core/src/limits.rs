//! Limit kinds and their adjustable bounds table

use serde::{Deserialize, Serialize};

/// User-selectable stop criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitKind {
    /// Accumulated charge in mAh
    #[default]
    Capacity,
    /// Accumulated energy in mWh
    Energy,
    /// Current droop below a threshold in mA
    Current,
    /// Charging time in minutes
    Duration,
}

impl LimitKind {
    pub const fn index(self) -> usize {
        match self {
            LimitKind::Capacity => 0,
            LimitKind::Energy => 1,
            LimitKind::Current => 2,
            LimitKind::Duration => 3,
        }
    }

    /// Next kind in selection order, wrapping from `Duration` back to `Capacity`.
    pub const fn next(self) -> Self {
        match self {
            LimitKind::Capacity => LimitKind::Energy,
            LimitKind::Energy => LimitKind::Current,
            LimitKind::Current => LimitKind::Duration,
            LimitKind::Duration => LimitKind::Capacity,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            LimitKind::Capacity => "CAPACITY",
            LimitKind::Energy => "ENERGY",
            LimitKind::Current => "CURRENT",
            LimitKind::Duration => "TIME",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            LimitKind::Capacity => "mAh",
            LimitKind::Energy => "mWh",
            LimitKind::Current => "mA",
            LimitKind::Duration => "min",
        }
    }
}

/// One row of the limit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSetting {
    pub value: u16,
    pub min: u16,
    pub max: u16,
    pub step: u16,
}

impl LimitSetting {
    pub const fn new(value: u16, min: u16, max: u16, step: u16) -> Self {
        Self {
            value,
            min,
            max,
            step,
        }
    }

    pub fn increase(&mut self) {
        self.value = self.value.saturating_add(self.step).min(self.max);
    }

    pub fn decrease(&mut self) {
        self.value = self.value.saturating_sub(self.step).max(self.min);
    }

    /// Set the value, pulling it into `[min, max]`.
    pub fn set_clamped(&mut self, value: u16) {
        self.value = value.clamp(self.min, self.max);
    }
}

/// Factory table: value / min / max / step per kind.
pub const DEFAULT_LIMITS: [LimitSetting; 4] = [
    LimitSetting::new(3_000, 500, 10_000, 100),
    LimitSetting::new(15_000, 1_000, 50_000, 500),
    LimitSetting::new(200, 100, 3_000, 100),
    LimitSetting::new(180, 10, 590, 10),
];

/// The four limit records, keyed by [`LimitKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitTable {
    settings: [LimitSetting; 4],
}

impl Default for LimitTable {
    fn default() -> Self {
        Self {
            settings: DEFAULT_LIMITS,
        }
    }
}

impl LimitTable {
    /// Default bounds with the given values, each clamped into its range.
    pub fn from_values(values: [u16; 4]) -> Self {
        let mut table = Self::default();
        for (setting, value) in table.settings.iter_mut().zip(values) {
            setting.set_clamped(value);
        }
        table
    }

    pub fn values(&self) -> [u16; 4] {
        self.settings.map(|s| s.value)
    }

    pub fn get(&self, kind: LimitKind) -> &LimitSetting {
        &self.settings[kind.index()]
    }

    pub fn value(&self, kind: LimitKind) -> u16 {
        self.get(kind).value
    }

    pub fn increase(&mut self, kind: LimitKind) {
        self.settings[kind.index()].increase();
    }

    pub fn decrease(&mut self, kind: LimitKind) {
        self.settings[kind.index()].decrease();
    }
}
