//! Unit tests for error handling and recovery

use crate::common::{MockError, Operation, create_enabled_driver, create_mock_driver};
use yas537::{Error, ExtCommand, MeasurementState};

#[test]
fn test_operations_require_init() {
    let (mut driver, interface) = create_mock_driver();

    assert_eq!(driver.terminate(), Err(Error::NotInitialized));
    assert_eq!(driver.set_enable(true), Err(Error::NotInitialized));
    assert_eq!(driver.is_enabled(), Err(Error::NotInitialized));
    assert_eq!(driver.set_delay(10), Err(Error::NotInitialized));
    assert_eq!(driver.delay_ms(), Err(Error::NotInitialized));
    assert_eq!(driver.set_position(1), Err(Error::NotInitialized));
    assert_eq!(driver.position(), Err(Error::NotInitialized));
    assert_eq!(driver.set_averaging(1), Err(Error::NotInitialized));
    assert_eq!(driver.averaging(), Err(Error::NotInitialized));
    assert_eq!(driver.measure(), Err(Error::NotInitialized));
    assert_eq!(driver.self_test(), Err(Error::NotInitialized));
    assert_eq!(driver.self_test_noise(), Err(Error::NotInitialized));
    assert_eq!(driver.last_raw_data(), Err(Error::NotInitialized));
    assert_eq!(driver.hardware_offset(), Err(Error::NotInitialized));
    assert_eq!(
        driver.extension(ExtCommand::GetHardwareOffset),
        Err(Error::NotInitialized)
    );

    assert!(interface.operations().is_empty());
}

#[test]
fn test_double_init_rejected() {
    let (mut driver, interface) = create_mock_driver();
    driver.init().unwrap();
    interface.clear_operations();

    assert_eq!(driver.init(), Err(Error::AlreadyInitialized));
    assert!(interface.operations().is_empty());
    assert!(driver.is_initialized());
}

#[test]
fn test_wrong_device_id() {
    let (mut driver, interface) = create_mock_driver();
    interface.set_device_id(0x05);

    assert_eq!(driver.init(), Err(Error::ChipIdMismatch(0x05)));
    assert!(!driver.is_initialized());
    assert!(!interface.is_open());
    assert_eq!(interface.operations().last(), Some(&Operation::Close));
}

#[test]
fn test_device_id_read_failure() {
    let (mut driver, interface) = create_mock_driver();
    interface.fail_next_read();

    assert_eq!(driver.init(), Err(Error::Bus(MockError::Communication)));
    assert!(!driver.is_initialized());
    assert!(!interface.is_open());

    // The next attempt succeeds
    driver.init().unwrap();
    assert_eq!(driver.device_id(), 0x07);
}

#[test]
fn test_open_failure() {
    let (mut driver, interface) = create_mock_driver();
    interface.fail_open(true);

    assert_eq!(driver.init(), Err(Error::Bus(MockError::Communication)));
    assert!(!driver.is_initialized());
}

#[test]
fn test_write_failure_during_enable() {
    let (mut driver, interface) = create_mock_driver();
    driver.init().unwrap();
    interface.fail_writes_to(Some(0x87));

    assert_eq!(
        driver.set_enable(true),
        Err(Error::Bus(MockError::Communication))
    );
    assert!(!driver.is_enabled().unwrap());
    assert!(!interface.is_open());

    interface.fail_writes_to(None);
    driver.set_enable(true).unwrap();
    assert!(driver.is_enabled().unwrap());
}

#[test]
fn test_calibration_read_failure() {
    let (mut driver, interface) = create_mock_driver();
    driver.init().unwrap();
    interface.fail_next_read();

    assert!(matches!(driver.set_enable(true), Err(Error::Bus(_))));
    assert!(!driver.is_enabled().unwrap());
    assert!(!interface.is_open());
}

#[test]
fn test_measure_read_failure_recovery() {
    let (mut driver, interface) = create_enabled_driver();
    interface.push_sample(8192, 8192, 8192);
    driver.measure().unwrap();

    interface.fail_next_read();
    interface.push_sample(8300, 8200, 8100);
    assert_eq!(driver.measure(), Err(Error::Bus(MockError::Communication)));
    assert_eq!(driver.state(), MeasurementState::Normal);
    // The failed read did not consume the queued sample
    assert_eq!(interface.pending_samples(), 1);

    let m = driver.measure().unwrap().unwrap();
    assert!(m.is_valid());
    assert_eq!(driver.last_raw_data().unwrap(), [8300, 8200, 8100, 0]);
}

#[test]
fn test_disable_ignores_reset_failure() {
    let (mut driver, interface) = create_enabled_driver();
    interface.fail_writes_to(Some(0x90));

    driver.set_enable(false).unwrap();

    assert!(!driver.is_enabled().unwrap());
    assert!(!interface.is_open());
}

#[test]
fn test_enable_is_idempotent() {
    let (mut driver, interface) = create_enabled_driver();
    interface.clear_operations();

    driver.set_enable(true).unwrap();
    assert!(interface.operations().is_empty());

    driver.set_enable(false).unwrap();
    interface.clear_operations();
    driver.set_enable(false).unwrap();
    assert!(interface.operations().is_empty());
}

#[test]
fn test_terminate_disables_and_ends_session() {
    let (mut driver, interface) = create_enabled_driver();

    driver.terminate().unwrap();

    assert!(!driver.is_initialized());
    assert!(!interface.is_open());
    assert_eq!(driver.is_enabled(), Err(Error::NotInitialized));
    assert_eq!(driver.measure(), Err(Error::NotInitialized));

    // A new session can start
    driver.init().unwrap();
    assert!(!driver.is_enabled().unwrap());
}

#[test]
fn test_terminate_with_reset_failure() {
    let (mut driver, interface) = create_enabled_driver();
    interface.fail_writes_to(Some(0x90));

    driver.terminate().unwrap();
    assert!(!driver.is_initialized());
    assert!(!interface.is_open());
}

#[test]
fn test_error_from_bus_error() {
    let error: Error<MockError> = MockError::Communication.into();
    assert_eq!(error, Error::Bus(MockError::Communication));
}
