//! Power sensor abstraction and the per-cycle [`Sample`]

mod ina219;

pub use ina219::*;

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: failed to {operation}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: initialization failed ({details})")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
}

/// Calibrated bus voltage and load current.
///
/// `current_ma` is already noise-floor corrected: negative or tiny readings
/// arrive here as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerReading {
    pub voltage_mv: u16,
    pub current_ma: u16,
}

/// One measurement taken by the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    pub voltage_mv: u16,
    pub current_ma: u16,
    /// Clock reading at acquisition
    pub timestamp_ms: u32,
}

impl Sample {
    pub const fn new(reading: PowerReading, timestamp_ms: u32) -> Self {
        Self {
            voltage_mv: reading.voltage_mv,
            current_ma: reading.current_ma,
            timestamp_ms,
        }
    }

    /// Instantaneous power, truncated to whole milliwatts.
    pub const fn power_mw(&self) -> u32 {
        self.voltage_mv as u32 * self.current_ma as u32 / 1000
    }
}

/// Trait for sensors that measure the pass-through line.
pub trait PowerSensor {
    /// Take one voltage + current measurement.
    fn read(&mut self) -> impl Future<Output = Result<PowerReading, SensorError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_truncates() {
        let sample = Sample::new(
            PowerReading {
                voltage_mv: 5_123,
                current_ma: 999,
            },
            0,
        );
        // 5123 * 999 = 5_117_877 -> 5117 mW
        assert_eq!(sample.power_mw(), 5_117);
    }

    #[test]
    fn test_power_at_full_scale_fits() {
        let sample = Sample::new(
            PowerReading {
                voltage_mv: u16::MAX,
                current_ma: u16::MAX,
            },
            0,
        );
        assert_eq!(sample.power_mw(), 4_294_836);
    }
}
