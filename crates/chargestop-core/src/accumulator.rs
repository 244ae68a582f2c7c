//! Charge and energy integration
//!
//! Every cycle the latest [`Sample`] is integrated over the time since the
//! previous cycle. The arithmetic is integer-only and truncating so that a
//! given sample stream always produces the same totals:
//!
//! - `power_mW = voltage_mV * current_mA / 1000`
//! - `capacity_uAh += elapsed_ms * current_mA / 3600`
//! - `energy_uWh += elapsed_ms * power_mW / 3600`
//!
//! Truncation loses at most one µAh / µWh per cycle.

use crate::sensors::Sample;

/// Milliseconds per hour divided by µ-units per milli-unit.
const MS_PER_HOUR_PER_MILLI: u64 = 3_600;

/// Running totals since power-on (or the last reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// Accumulated charge in microampere-hours
    pub capacity_uah: u32,
    /// Accumulated energy in microwatt-hours
    pub energy_uwh: u32,
    /// Time spent with the output enabled
    pub charge_duration_ms: u32,
}

impl Totals {
    /// Charge in whole milliampere-hours (truncating).
    pub const fn capacity_mah(&self) -> u32 {
        self.capacity_uah / 1000
    }

    /// Energy in whole milliwatt-hours (truncating).
    pub const fn energy_mwh(&self) -> u32 {
        self.energy_uwh / 1000
    }

    /// Whole seconds of charging, saturated at `cap_secs`.
    pub const fn charge_secs(&self, cap_secs: u32) -> u32 {
        let secs = self.charge_duration_ms / 1000;
        if secs > cap_secs { cap_secs } else { secs }
    }

    /// Whole minutes of charging, derived from the saturated seconds.
    pub const fn charge_minutes(&self, cap_secs: u32) -> u32 {
        self.charge_secs(cap_secs) / 60
    }
}

/// Integrator owning the [`Totals`].
#[derive(Debug, Default)]
pub struct Accumulator {
    totals: Totals,
}

impl Accumulator {
    pub const fn new() -> Self {
        Self {
            totals: Totals {
                capacity_uah: 0,
                energy_uwh: 0,
                charge_duration_ms: 0,
            },
        }
    }

    /// Integrate one sample over `elapsed_ms` and return the updated totals.
    ///
    /// The charge timer only runs while `is_charging`.
    pub fn integrate(&mut self, sample: &Sample, elapsed_ms: u32, is_charging: bool) -> Totals {
        let elapsed = elapsed_ms as u64;

        let charge_uah = elapsed * sample.current_ma as u64 / MS_PER_HOUR_PER_MILLI;
        let energy_uwh = elapsed * sample.power_mw() as u64 / MS_PER_HOUR_PER_MILLI;

        self.totals.capacity_uah = saturating_add_u64(self.totals.capacity_uah, charge_uah);
        self.totals.energy_uwh = saturating_add_u64(self.totals.energy_uwh, energy_uwh);

        if is_charging {
            self.totals.charge_duration_ms =
                self.totals.charge_duration_ms.saturating_add(elapsed_ms);
        }

        self.totals
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Zero all totals. Only the user-initiated reset calls this.
    pub fn reset(&mut self) {
        self.totals = Totals::default();
    }
}

fn saturating_add_u64(total: u32, increment: u64) -> u32 {
    let increment = u32::try_from(increment).unwrap_or(u32::MAX);
    total.saturating_add(increment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::PowerReading;

    fn sample(voltage_mv: u16, current_ma: u16) -> Sample {
        Sample::new(
            PowerReading {
                voltage_mv,
                current_ma,
            },
            0,
        )
    }

    #[test]
    fn test_exact_division_is_lossless() {
        let mut acc = Accumulator::new();
        let totals = acc.integrate(&sample(5_000, 1_000), 3_600, true);

        assert_eq!(totals.capacity_uah, 1_000);
        assert_eq!(totals.energy_uwh, 5_000);
        assert_eq!(totals.charge_duration_ms, 3_600);
    }

    #[test]
    fn test_truncation_is_preserved() {
        let mut acc = Accumulator::new();
        let totals = acc.integrate(&sample(5_000, 1), 1, true);

        assert_eq!(totals.capacity_uah, 0);
        assert_eq!(totals.energy_uwh, 0);
    }

    #[test]
    fn test_truncation_accumulates_per_cycle() {
        let mut acc = Accumulator::new();
        // 125 ms * 100 mA / 3600 = 3.47 -> 3 per cycle
        for _ in 0..8 {
            acc.integrate(&sample(5_000, 100), 125, true);
        }
        assert_eq!(acc.totals().capacity_uah, 24);
    }

    #[test]
    fn test_duration_only_runs_while_charging() {
        let mut acc = Accumulator::new();
        acc.integrate(&sample(5_000, 500), 125, true);
        let totals = acc.integrate(&sample(5_000, 500), 125, false);

        assert_eq!(totals.charge_duration_ms, 125);
        // 125 * 500 / 3600 = 17 per cycle, integrated regardless of run state
        assert_eq!(totals.capacity_uah, 34);
    }

    #[test]
    fn test_totals_are_monotonic() {
        let mut acc = Accumulator::new();
        let mut previous = Totals::default();
        let currents = [0u16, 5, 2_000, 17, 0, 3_000, 1];

        for (i, &current) in currents.iter().cycle().take(200).enumerate() {
            let totals = acc.integrate(&sample(5_100, current), (i as u32 % 7) * 40, true);
            assert!(totals.capacity_uah >= previous.capacity_uah);
            assert!(totals.energy_uwh >= previous.energy_uwh);
            assert!(totals.charge_duration_ms >= previous.charge_duration_ms);
            previous = totals;
        }
    }

    #[test]
    fn test_totals_saturate_instead_of_wrapping() {
        let mut acc = Accumulator::new();
        acc.integrate(&sample(u16::MAX, u16::MAX), u32::MAX, true);
        let totals = acc.integrate(&sample(u16::MAX, u16::MAX), u32::MAX, true);

        assert_eq!(totals.capacity_uah, u32::MAX);
        assert_eq!(totals.energy_uwh, u32::MAX);
        assert_eq!(totals.charge_duration_ms, u32::MAX);
    }

    #[test]
    fn test_reset_zeroes_totals() {
        let mut acc = Accumulator::new();
        acc.integrate(&sample(5_000, 1_000), 3_600, true);
        acc.reset();
        assert_eq!(*acc.totals(), Totals::default());
    }

    #[test]
    fn test_minutes_use_capped_seconds() {
        let totals = Totals {
            charge_duration_ms: 40_000_000,
            ..Totals::default()
        };
        assert_eq!(totals.charge_secs(35_999), 35_999);
        assert_eq!(totals.charge_minutes(35_999), 599);

        let totals = Totals {
            charge_duration_ms: 179_999,
            ..Totals::default()
        };
        assert_eq!(totals.charge_minutes(35_999), 2);
    }
}
