//! Shared async I2C bus
//!
//! The power sensor sits on the same I2C bus as the board's power-management
//! and IO-expander chips. Each user holds a [`SharedI2cDevice`] that locks the
//! bus for the duration of one operation, so register sequences of different
//! chips never interleave within a single transfer.

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

/// Bus type shared between devices on the board.
pub type SharedI2cBus<T> = Mutex<CriticalSectionRawMutex, T>;

/// One device's handle onto a bus guarded by an embassy async [`Mutex`].
///
/// ```rust,ignore
/// static I2C_BUS: StaticCell<SharedI2cBus<I2c<'static, Async>>> = StaticCell::new();
/// let bus = I2C_BUS.init(Mutex::new(i2c));
///
/// let sensor = Ina219::new(SharedI2cDevice::new(bus), INA219_DEFAULT_ADDRESS);
/// let pmu = SharedI2cDevice::new(bus);
/// ```
pub struct SharedI2cDevice<'a, T, M: RawMutex = CriticalSectionRawMutex> {
    bus: &'a Mutex<M, T>,
}

impl<'a, T, M: RawMutex> SharedI2cDevice<'a, T, M> {
    #[inline]
    pub const fn new(bus: &'a Mutex<M, T>) -> Self {
        Self { bus }
    }
}

impl<T: ErrorType, M: RawMutex> ErrorType for SharedI2cDevice<'_, T, M> {
    type Error = T::Error;
}

impl<T: I2c, M: RawMutex> I2c for SharedI2cDevice<'_, T, M> {
    #[inline]
    async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.lock().await.read(address, read).await
    }

    #[inline]
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.bus.lock().await.write(address, write).await
    }

    #[inline]
    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.write_read(address, write, read).await
    }

    /// The lock is held across every operation in the list.
    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.transaction(address, operations).await
    }
}
