//! Unit tests for the I2C register interface

use device_driver::RegisterInterface;
use embedded_hal::i2c::{ErrorType, I2c, Operation as I2cOperation};
use yas537::{I2C_ADDRESS, I2cInterface};

/// I2C bus that records every write and answers reads with a fixed byte
#[derive(Debug, Default)]
struct RecordingI2c {
    writes: Vec<(u8, Vec<u8>)>,
}

impl ErrorType for RecordingI2c {
    type Error = core::convert::Infallible;
}

impl I2c for RecordingI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [I2cOperation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            match op {
                I2cOperation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                I2cOperation::Read(buf) => buf.fill(0x5A),
            }
        }
        Ok(())
    }
}

#[test]
fn test_single_register_write() {
    let mut interface = I2cInterface::default(RecordingI2c::default());
    interface.write_register(0x82, 8, &[0x08]).unwrap();

    let i2c = interface.release();
    assert_eq!(i2c.writes, vec![(I2C_ADDRESS, vec![0x82, 0x08])]);
}

#[test]
fn test_long_write_split_into_bursts() {
    let mut interface = I2cInterface::new(RecordingI2c::default(), 0x2F);
    let payload: Vec<u8> = (0..40).collect();

    interface.write_register(0x93, 320, &payload).unwrap();

    let i2c = interface.release();
    assert_eq!(i2c.writes.len(), 3);

    // Every payload byte is sent exactly once, at its own register address
    let mut sent = Vec::new();
    let mut expected_start = 0x93u8;
    for (address, bytes) in &i2c.writes {
        assert_eq!(*address, 0x2F);
        assert_eq!(bytes[0], expected_start);
        expected_start = expected_start.wrapping_add((bytes.len() - 1) as u8);
        sent.extend_from_slice(&bytes[1..]);
    }
    assert_eq!(sent, payload);
    assert_eq!(i2c.writes[0].1.len(), 1 + 17);
    assert_eq!(i2c.writes[2].1, vec![0xB5, 34, 35, 36, 37, 38, 39]);
}

#[test]
fn test_empty_write_sends_nothing() {
    let mut interface = I2cInterface::default(RecordingI2c::default());
    interface.write_register(0x82, 0, &[]).unwrap();
    assert!(interface.release().writes.is_empty());
}

#[test]
fn test_read_sends_register_address() {
    let mut interface = I2cInterface::default(RecordingI2c::default());
    let mut data = [0u8; 8];

    interface.read_register(0xB0, 64, &mut data).unwrap();

    assert_eq!(data, [0x5A; 8]);
    assert_eq!(interface.release().writes, vec![(I2C_ADDRESS, vec![0xB0])]);
}
