//! Bus interface implementations for the YAS537
//!
//! The driver talks to the device through the `device-driver`
//! [`RegisterInterface`] trait. [`DeviceBus`] adds the open/close hooks the
//! enable/disable sequence calls around a session, so hosts that power-gate or
//! share the bus can act on them.

use crate::I2C_ADDRESS;
use crate::registers::CALR_LEN;

/// Largest payload sent in one I2C write (one calibration block)
const MAX_BURST: usize = CALR_LEN;

use device_driver::RegisterInterface;

/// Register bus with session hooks
///
/// `open` is called before the device is accessed for a session (init, enable,
/// self-test) and `close` when the session ends. Both default to no-ops.
pub trait DeviceBus: RegisterInterface<AddressType = u8> {
    /// Acquire the bus for the magnetometer
    ///
    /// # Errors
    ///
    /// Returns the bus error if the device cannot be reached.
    fn open(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Release the bus
    ///
    /// # Errors
    ///
    /// Returns the bus error if releasing fails.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// I2C interface for the YAS537
pub struct I2cInterface<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cInterface<I2C> {
    /// Create a new I2C interface with the default address (0x2E)
    ///
    /// # Arguments
    /// * `i2c` - The I2C peripheral
    ///
    /// # Example
    /// ```ignore
    /// let interface = I2cInterface::default(i2c);
    /// let mut mag = Yas537Driver::new(interface, delay, LogicalTime::new());
    /// ```
    pub const fn default(i2c: I2C) -> Self {
        Self {
            i2c,
            address: I2C_ADDRESS,
        }
    }

    /// Create a new I2C interface with a custom device address
    ///
    /// # Arguments
    /// * `i2c` - The I2C peripheral
    /// * `address` - The I2C device address
    pub const fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Consume the interface and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> RegisterInterface for I2cInterface<I2C>
where
    I2C: embedded_hal::i2c::I2c<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len() for I2C
        self.i2c.write_read(self.address, &[address], read_data)
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len() for I2C
        // Longer payloads go out as consecutive bursts; the register address
        // auto-increments, so each burst starts where the previous one ended
        let mut buffer = [0u8; 1 + MAX_BURST];
        let mut start = address;
        for chunk in write_data.chunks(MAX_BURST) {
            buffer[0] = start;
            buffer[1..=chunk.len()].copy_from_slice(chunk);
            self.i2c.write(self.address, &buffer[..=chunk.len()])?;
            // Bounded by MAX_BURST
            #[allow(clippy::cast_possible_truncation)]
            let advance = chunk.len() as u8;
            start = start.wrapping_add(advance);
        }
        Ok(())
    }
}

impl<I2C, E> DeviceBus for I2cInterface<I2C> where I2C: embedded_hal::i2c::I2c<Error = E> {}
