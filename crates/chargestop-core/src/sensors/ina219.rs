use embedded_hal_async::i2c::I2c;
use log::{debug, error};

use super::{PowerReading, PowerSensor, SensorError};

const SENSOR_NAME: &str = "INA219";

/// Address with A0/A1 tied to ground.
pub const INA219_DEFAULT_ADDRESS: u8 = 0x40;

/// Raw current readings below this are treated as noise.
pub const CURRENT_NOISE_FLOOR_RAW: u16 = 5;

const REG_CONFIG: u8 = 0x00;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_CURRENT: u8 = 0x04;
const REG_CALIBRATION: u8 = 0x05;

/// 16 V bus range, ±40 mV shunt range, 12-bit bus and shunt ADC, continuous.
const CONFIG_16V_40MV_12BIT: u16 = 0x019F;

/// 0.04096 / (1 mA * 10 mΩ): one current LSB equals one milliampere.
const CALIBRATION_1MA_PER_BIT: u16 = 4096;

/// Bus voltage register LSB in millivolts (after dropping the 3 status bits).
const BUS_VOLTAGE_LSB_MV: u16 = 4;

/// Convert a raw current register value into milliamperes.
///
/// Reverse current (sign bit set) and readings under the noise floor become 0.
pub const fn current_from_raw(raw: u16) -> u16 {
    if raw & 0x8000 != 0 || raw < CURRENT_NOISE_FLOOR_RAW {
        0
    } else {
        raw
    }
}

/// Convert a raw bus voltage register value into millivolts.
pub const fn voltage_from_raw(raw: u16) -> u16 {
    (raw >> 3) * BUS_VOLTAGE_LSB_MV
}

/// INA219 high-side current/voltage monitor on a 10 mΩ shunt.
pub struct Ina219<I> {
    i2c: I,
    address: u8,
    configured: bool,
}

impl<I: I2c> Ina219<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address,
            configured: false,
        }
    }

    /// Write configuration and calibration registers.
    ///
    /// Called automatically before the first measurement.
    pub async fn init(&mut self) -> Result<(), SensorError> {
        self.write_register(REG_CONFIG, CONFIG_16V_40MV_12BIT)
            .await
            .map_err(|_| SensorError::InitializationFailed {
                sensor: SENSOR_NAME,
                details: "configuration register write failed",
            })?;
        self.write_register(REG_CALIBRATION, CALIBRATION_1MA_PER_BIT)
            .await
            .map_err(|_| SensorError::InitializationFailed {
                sensor: SENSOR_NAME,
                details: "calibration register write failed",
            })?;

        debug!("{} configured at 0x{:02x}", SENSOR_NAME, self.address);
        self.configured = true;
        Ok(())
    }

    pub async fn read_voltage_mv(&mut self) -> Result<u16, SensorError> {
        let raw = self.read_register(REG_BUS_VOLTAGE, "read bus voltage").await?;
        Ok(voltage_from_raw(raw))
    }

    pub async fn read_current_ma(&mut self) -> Result<u16, SensorError> {
        let raw = self.read_register(REG_CURRENT, "read current").await?;
        Ok(current_from_raw(raw))
    }

    /// Release the bus.
    pub fn release(self) -> I {
        self.i2c
    }

    async fn write_register(&mut self, register: u8, value: u16) -> Result<(), I::Error> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[register, hi, lo])
            .await
            .inspect_err(|e| {
                error!(
                    "{} write to register 0x{:02x} failed: {:?}",
                    SENSOR_NAME, register, e
                )
            })
    }

    async fn read_register(
        &mut self,
        register: u8,
        operation: &'static str,
    ) -> Result<u16, SensorError> {
        let failed = SensorError::ReadFailed {
            sensor: SENSOR_NAME,
            operation,
        };

        // The register pointer and the data read are separate bus transactions.
        self.i2c.write(self.address, &[register]).await.map_err(|e| {
            error!("{} pointer write 0x{:02x} failed: {:?}", SENSOR_NAME, register, e);
            failed
        })?;

        let mut buf = [0u8; 2];
        self.i2c.read(self.address, &mut buf).await.map_err(|e| {
            error!("{} register 0x{:02x} read failed: {:?}", SENSOR_NAME, register, e);
            failed
        })?;

        Ok(u16::from_be_bytes(buf))
    }
}

impl<I: I2c> PowerSensor for Ina219<I> {
    async fn read(&mut self) -> Result<PowerReading, SensorError> {
        if !self.configured {
            self.init().await?;
        }

        let voltage_mv = self.read_voltage_mv().await?;
        let current_ma = self.read_current_ma().await?;

        Ok(PowerReading {
            voltage_mv,
            current_ma,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_async::i2c::{ErrorType, Operation};

    /// Register file of a fake INA219 driven through plain write/read transfers.
    struct FakeIna219 {
        registers: [u16; 6],
        pointer: usize,
        fail: bool,
    }

    impl FakeIna219 {
        fn new() -> Self {
            Self {
                registers: [0; 6],
                pointer: 0,
                fail: false,
            }
        }
    }

    impl ErrorType for FakeIna219 {
        type Error = ErrorKind;
    }

    impl I2c for FakeIna219 {
        async fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            assert_eq!(address, INA219_DEFAULT_ADDRESS);
            if self.fail {
                return Err(ErrorKind::Bus);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        self.pointer = bytes[0] as usize;
                        if bytes.len() == 3 {
                            self.registers[self.pointer] = u16::from_be_bytes([bytes[1], bytes[2]]);
                        }
                    }
                    Operation::Read(buf) => {
                        buf.copy_from_slice(&self.registers[self.pointer].to_be_bytes());
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_first_read_configures_chip() {
        let mut sensor = Ina219::new(FakeIna219::new(), INA219_DEFAULT_ADDRESS);
        block_on(sensor.read()).unwrap();

        let fake = sensor.release();
        assert_eq!(fake.registers[REG_CONFIG as usize], CONFIG_16V_40MV_12BIT);
        assert_eq!(fake.registers[REG_CALIBRATION as usize], CALIBRATION_1MA_PER_BIT);
    }

    #[test]
    fn test_read_scales_registers() {
        let mut fake = FakeIna219::new();
        // 5004 mV -> 1251 LSB shifted past the 3 status bits
        fake.registers[REG_BUS_VOLTAGE as usize] = (1251 << 3) | 0b010;
        fake.registers[REG_CURRENT as usize] = 1_480;

        let mut sensor = Ina219::new(fake, INA219_DEFAULT_ADDRESS);
        let reading = block_on(sensor.read()).unwrap();

        assert_eq!(reading.voltage_mv, 5_004);
        assert_eq!(reading.current_ma, 1_480);
    }

    #[test]
    fn test_negative_current_is_zero() {
        let mut fake = FakeIna219::new();
        fake.registers[REG_CURRENT as usize] = (-12i16) as u16;

        let mut sensor = Ina219::new(fake, INA219_DEFAULT_ADDRESS);
        assert_eq!(block_on(sensor.read()).unwrap().current_ma, 0);
    }

    #[test]
    fn test_noise_floor() {
        assert_eq!(current_from_raw(4), 0);
        assert_eq!(current_from_raw(5), 5);
        assert_eq!(current_from_raw(0x8000), 0);
    }

    #[test]
    fn test_bus_failure_reports_error() {
        let mut fake = FakeIna219::new();
        fake.fail = true;

        let mut sensor = Ina219::new(fake, INA219_DEFAULT_ADDRESS);
        assert!(matches!(
            block_on(sensor.read()),
            Err(SensorError::InitializationFailed { .. })
        ));
    }
}
