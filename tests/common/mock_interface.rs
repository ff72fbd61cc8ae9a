//! Mock interface implementation for testing the YAS537 driver

use device_driver::RegisterInterface;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use yas537::DeviceBus;
use yas537::registers::{CALR, CALR_LEN, DATAR, DATAR_LEN};

/// Records operations performed on the mock interface
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Burst or single register read
    ReadRegister {
        /// First register address
        address: u8,
        /// Number of bytes read
        len: usize,
    },
    /// Write register operation
    WriteRegister {
        /// Register address
        address: u8,
        /// Value that was written
        value: u8,
    },
    /// Bus opened
    Open,
    /// Bus closed
    Close,
}

/// Shared state for mock interface (uses interior mutability)
#[derive(Debug)]
struct MockState {
    /// Simulated register values
    registers: HashMap<u8, u8>,

    /// Operations log for verification
    operations: Vec<Operation>,

    /// Failure injection flags
    fail_next_read: bool,
    fail_next_write: bool,
    fail_open: bool,
    fail_writes_to: Option<u8>,

    /// Samples returned by successive `DATAR` reads; the last one repeats
    samples: VecDeque<[u8; DATAR_LEN]>,
    current_sample: [u8; DATAR_LEN],

    open: bool,
}

impl MockState {
    fn new() -> Self {
        let mut state = Self {
            registers: HashMap::new(),
            operations: Vec::new(),
            fail_next_read: false,
            fail_next_write: false,
            fail_open: false,
            fail_writes_to: None,
            samples: VecDeque::new(),
            current_sample: sample_bytes(8192, 8192, 8192, 0, false, false),
            open: false,
        };

        // DIDR = 0x07
        state.registers.insert(0x80, 0x07);
        state.set_calibration(&crate::common::test_utils::version0_calibration());

        state
    }

    fn set_calibration(&mut self, block: &[u8; CALR_LEN]) {
        for (i, &b) in block.iter().enumerate() {
            self.registers.insert(CALR + i as u8, b);
        }
    }

    fn next_sample(&mut self) -> [u8; DATAR_LEN] {
        if let Some(sample) = self.samples.pop_front() {
            self.current_sample = sample;
        }
        self.current_sample
    }
}

/// Encode a `DATAR` result
pub fn sample_bytes(x: u16, y1: u16, y2: u16, t: u16, busy: bool, bad: bool) -> [u8; DATAR_LEN] {
    let [t_h, t_l] = t.to_be_bytes();
    let [x_h, x_l] = (x & 0x3FFF).to_be_bytes();
    let [y1_h, y1_l] = y1.to_be_bytes();
    let [y2_h, y2_l] = y2.to_be_bytes();
    let flags = (u8::from(busy) << 7) | (u8::from(bad) << 6);
    [t_h, t_l, flags | x_h, x_l, y1_h, y1_l, y2_h, y2_l]
}

/// Mock interface for testing
#[derive(Clone)]
pub struct MockInterface {
    state: Rc<RefCell<MockState>>,
}

impl MockInterface {
    /// Create a new mock interface with a valid device ID and a version 0 calibration
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState::new())),
        }
    }

    /// Set a register value
    #[allow(dead_code)]
    pub fn set_register(&self, address: u8, value: u8) {
        self.state.borrow_mut().registers.insert(address, value);
    }

    /// Get a register value
    #[allow(dead_code)]
    pub fn get_register(&self, address: u8) -> u8 {
        self.state
            .borrow()
            .registers
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Set DIDR register value
    #[allow(dead_code)]
    pub fn set_device_id(&self, value: u8) {
        self.set_register(0x80, value);
    }

    /// Replace the calibration block
    #[allow(dead_code)]
    pub fn set_calibration(&self, block: &[u8; CALR_LEN]) {
        self.state.borrow_mut().set_calibration(block);
    }

    /// Queue a clean sample
    #[allow(dead_code)]
    pub fn push_sample(&self, x: u16, y1: u16, y2: u16) {
        self.push_sample_with_flags(x, y1, y2, 0, false, false);
    }

    /// Queue a sample with temperature and status flags
    #[allow(dead_code)]
    pub fn push_sample_with_flags(&self, x: u16, y1: u16, y2: u16, t: u16, busy: bool, bad: bool) {
        self.state
            .borrow_mut()
            .samples
            .push_back(sample_bytes(x, y1, y2, t, busy, bad));
    }

    /// Number of queued samples not yet read
    #[allow(dead_code)]
    pub fn pending_samples(&self) -> usize {
        self.state.borrow().samples.len()
    }

    /// Inject a read failure on the next read operation
    #[allow(dead_code)]
    pub fn fail_next_read(&self) {
        self.state.borrow_mut().fail_next_read = true;
    }

    /// Inject a write failure on the next write operation
    #[allow(dead_code)]
    pub fn fail_next_write(&self) {
        self.state.borrow_mut().fail_next_write = true;
    }

    /// Fail every write to `address` (`None` clears)
    #[allow(dead_code)]
    pub fn fail_writes_to(&self, address: Option<u8>) {
        self.state.borrow_mut().fail_writes_to = address;
    }

    /// Make `open()` fail
    #[allow(dead_code)]
    pub fn fail_open(&self, enable: bool) {
        self.state.borrow_mut().fail_open = enable;
    }

    /// Whether the bus is currently open
    #[allow(dead_code)]
    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    /// Get the operations log
    #[allow(dead_code)]
    pub fn operations(&self) -> Vec<Operation> {
        self.state.borrow().operations.clone()
    }

    /// Clear the operations log
    #[allow(dead_code)]
    pub fn clear_operations(&self) {
        self.state.borrow_mut().operations.clear();
    }

    /// Values written to `address`, in order
    #[allow(dead_code)]
    pub fn writes_to(&self, address: u8) -> Vec<u8> {
        self.state
            .borrow()
            .operations
            .iter()
            .filter_map(|op| match op {
                Operation::WriteRegister { address: a, value } if *a == address => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// All register writes as `(address, value)`, in order
    #[allow(dead_code)]
    pub fn write_log(&self) -> Vec<(u8, u8)> {
        self.state
            .borrow()
            .operations
            .iter()
            .filter_map(|op| match op {
                Operation::WriteRegister { address, value } => Some((*address, *value)),
                _ => None,
            })
            .collect()
    }

    /// Count operations matching `f`
    #[allow(dead_code)]
    pub fn count(&self, f: impl Fn(&Operation) -> bool) -> usize {
        self.state.borrow().operations.iter().filter(|op| f(op)).count()
    }
}

/// Mock error type
#[derive(Debug, Clone, PartialEq)]
pub enum MockError {
    /// Simulated communication error
    Communication,
}

impl RegisterInterface for MockInterface {
    type Error = MockError;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();

        // Check for injected failure
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(MockError::Communication);
        }

        state.operations.push(Operation::ReadRegister {
            address,
            len: read_data.len(),
        });

        if address == DATAR {
            let sample = state.next_sample();
            let len = read_data.len().min(DATAR_LEN);
            read_data[..len].copy_from_slice(&sample[..len]);
            return Ok(());
        }

        for (i, byte) in read_data.iter_mut().enumerate() {
            let reg_addr = address.wrapping_add(i as u8);
            *byte = state.registers.get(&reg_addr).copied().unwrap_or(0);
        }

        Ok(())
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();

        // Check for injected failure
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(MockError::Communication);
        }
        if state.fail_writes_to == Some(address) {
            return Err(MockError::Communication);
        }

        for (i, &byte) in write_data.iter().enumerate() {
            let reg_addr = address.wrapping_add(i as u8);
            state.registers.insert(reg_addr, byte);
            state.operations.push(Operation::WriteRegister {
                address: reg_addr,
                value: byte,
            });
        }

        Ok(())
    }
}

impl DeviceBus for MockInterface {
    fn open(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_open {
            return Err(MockError::Communication);
        }
        state.open = true;
        state.operations.push(Operation::Open);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.open = false;
        state.operations.push(Operation::Close);
        Ok(())
    }
}

impl Default for MockInterface {
    fn default() -> Self {
        Self::new()
    }
}
