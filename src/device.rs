//! High-level driver API for the YAS537
//!
//! [`Yas537Driver`] owns the bus, a delay provider and a time source, and keeps
//! the whole measurement session: configuration, the decoded calibration, the
//! coil re-initialization state and the diagnostic caches.
//!
//! Lifecycle:
//!
//! 1. [`init`](Yas537Driver::init) checks the device ID and resets the session to
//!    its configured defaults.
//! 2. [`set_enable(true)`](Yas537Driver::set_enable) soft-resets the device,
//!    programs the calibration and starts continuous measurement.
//! 3. [`measure`](Yas537Driver::measure) is called once per sampling period.
//! 4. [`terminate`](Yas537Driver::terminate) disables the device.

use crate::calibration::{Calibration, CorrectionModel};
use crate::clock::TimeSource;
use crate::config::{Averaging, MagConfig, interval_register};
use crate::convert::{Measurement, MountPosition, to_physical};
use crate::diagnostics::{
    DIRECTION_NOT_COMPUTED, ExtCommand, ExtResponse, SelfTestResult, noise_deviation, sensitivity,
};
use crate::interface::DeviceBus;
use crate::registers::{CALR, CALR_LEN, COIL_INIT, DATAR, DATAR_LEN, RegisterDevice, SOFT_RESET};
use crate::sample::{OverflowMask, RawSample};
use crate::state::{CoilMonitor, MeasurementState, Verdict};
use crate::{DEVICE_ID, Error};

use device_driver::RegisterInterface;
use embedded_hal::delay::DelayNs;

/// Settling time after the bus is opened
const POWER_ON_RESET_US: u32 = 4000;

/// `ADC_MODE` field value written with every averaging level
const ADC_MODE: u8 = 0b111;

/// `TRMR` value enabling the programmed trim
const TRIM_ENABLE: u8 = 0xFF;

/// One sample after correction
#[derive(Debug, Clone, Copy)]
struct Reading {
    raw: RawSample,
    corrected: [u16; 3],
    overflow: OverflowMask,
}

/// Main driver for the YAS537
pub struct Yas537Driver<I, D, T> {
    device: RegisterDevice<I>,
    delay: D,
    time: T,
    // Defaults applied by init()
    config: MagConfig,
    // Live session settings
    settings: MagConfig,
    initialized: bool,
    enabled: bool,
    device_id: u8,
    model: CorrectionModel,
    hard_offset: [i8; 3],
    last_raw: [u16; 4],
    monitor: CoilMonitor,
}

impl<I, D, T> Yas537Driver<I, D, T>
where
    I: DeviceBus,
    D: DelayNs,
    T: TimeSource,
{
    /// Create a driver with the default configuration
    ///
    /// No bus traffic happens until `init()`.
    #[must_use]
    pub fn new(interface: I, delay: D, time: T) -> Self {
        Self::with_config(interface, delay, time, MagConfig::default())
    }

    /// Create a driver with a custom configuration
    ///
    /// `config` is the state every `init()` starts from.
    #[must_use]
    pub fn with_config(interface: I, delay: D, time: T, config: MagConfig) -> Self {
        Self {
            device: RegisterDevice::new(interface),
            delay,
            time,
            config,
            settings: config,
            initialized: false,
            enabled: false,
            device_id: 0,
            model: CorrectionModel::Identity,
            hard_offset: [i8::MIN; 3],
            last_raw: [0; 4],
            monitor: CoilMonitor::new(config.coil_timeout_ms, config.drift_threshold),
        }
    }

    /// Verify the device and start a session
    ///
    /// Opens the bus, checks `DIDR` and closes it again. The session starts
    /// disabled with the configured defaults.
    ///
    /// # Errors
    ///
    /// - `AlreadyInitialized` if the session is already running
    /// - `ChipIdMismatch` if `DIDR` does not read 0x07
    /// - `Bus` if communication fails
    pub fn init(&mut self) -> Result<(), Error<I::Error>> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }

        self.open()?;
        let id = match self.device.didr().read() {
            Ok(reg) => reg.device_id(),
            Err(e) => {
                let _ = self.device.interface.close();
                return Err(Error::Bus(e));
            }
        };
        if id != DEVICE_ID {
            let _ = self.device.interface.close();
            return Err(Error::ChipIdMismatch(id));
        }
        self.device.interface.close()?;

        self.device_id = id;
        self.settings = self.config;
        self.enabled = false;
        self.model = CorrectionModel::Identity;
        self.hard_offset = [i8::MIN; 3];
        self.last_raw = [0; 4];
        self.monitor = CoilMonitor::new(self.config.coil_timeout_ms, self.config.drift_threshold);
        self.monitor.reset(self.time.now_ms());
        self.initialized = true;

        #[cfg(feature = "defmt")]
        defmt::info!("YAS537 initialized (id {=u8:#x})", id);

        Ok(())
    }

    /// End the session
    ///
    /// The session is closed even if disabling the device fails.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` without a session, otherwise the error of the
    /// disable step.
    pub fn terminate(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        let result = self.set_enable(false);
        self.initialized = false;
        result
    }

    /// Whether `init()` has succeeded and `terminate()` was not called since
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Enable or disable continuous measurement
    ///
    /// Enabling opens the bus, resets the device, programs the calibration and
    /// starts continuous mode; the first good sample afterwards becomes the
    /// drift baseline. Disabling soft-resets the device and closes the bus.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` without a session
    /// - `CalibrationInvalid` if the calibration block is blank or unknown
    /// - `Bus` if communication fails
    pub fn set_enable(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        if self.enabled == enable {
            return Ok(());
        }

        if enable {
            self.open()?;
            if let Err(e) = self.reset() {
                let _ = self.device.interface.close();
                return Err(e);
            }
            if let Err(e) = self.cont_start() {
                let _ = self.device.interface.close();
                return Err(e);
            }
            self.enabled = true;
        } else {
            // Reset errors are ignored, the bus is closed regardless
            let _ = self.device.srstr().write(|w| {
                w.set_value(SOFT_RESET);
            });
            self.enabled = false;
            self.device.interface.close()?;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("YAS537 enable: {}", enable);

        Ok(())
    }

    /// Whether continuous measurement is running
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` without a session.
    pub fn is_enabled(&self) -> Result<bool, Error<I::Error>> {
        self.ensure_initialized()?;
        Ok(self.enabled)
    }

    /// Set the sampling delay in milliseconds
    ///
    /// Restarts an enabled session so the new interval is programmed.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` without a session, or the restart error.
    pub fn set_delay(&mut self, delay_ms: u32) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        self.settings.delay_ms = delay_ms;
        self.restart()
    }

    /// Sampling delay in milliseconds
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` without a session.
    pub fn delay_ms(&self) -> Result<u32, Error<I::Error>> {
        self.ensure_initialized()?;
        Ok(self.settings.delay_ms)
    }

    /// Set the mounting position (0..=7, 2 is the identity)
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` without a session or `InvalidArgument` for
    /// positions above 7.
    pub fn set_position(&mut self, position: u8) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        self.settings.position =
            MountPosition::try_from(position).map_err(|_| Error::InvalidArgument)?;
        Ok(())
    }

    /// Mounting position
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` without a session.
    pub fn position(&self) -> Result<MountPosition, Error<I::Error>> {
        self.ensure_initialized()?;
        Ok(self.settings.position)
    }

    /// Set the averaging level (0 = 32 samples .. 3 = 256 samples)
    ///
    /// Restarts an enabled session so the new level is programmed.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` without a session, `InvalidArgument` for levels
    /// above 3, or the restart error.
    pub fn set_averaging(&mut self, level: u8) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        self.settings.averaging = Averaging::try_from(level).map_err(|_| Error::InvalidArgument)?;
        self.restart()
    }

    /// Averaging level
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` without a session.
    pub fn averaging(&self) -> Result<Averaging, Error<I::Error>> {
        self.ensure_initialized()?;
        Ok(self.settings.averaging)
    }

    /// Read and process one sample
    ///
    /// Returns `Ok(None)` while disabled. Every call advances a logical time
    /// source by the sampling delay, even when disabled.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` without a session
    /// - `Busy` if the device is still converting (the state machine is not
    ///   advanced; retry later)
    /// - `Bus` if communication fails
    pub fn measure(&mut self) -> Result<Option<Measurement>, Error<I::Error>> {
        self.ensure_initialized()?;
        self.time.advance(self.settings.delay_ms);
        if !self.enabled {
            return Ok(None);
        }

        let reading = self.read_sample()?;
        let mut measurement =
            Measurement::from_corrected(reading.corrected, reading.overflow, self.settings.position);

        let now = self.time.now_ms();
        if self.time.is_monotonic() {
            measurement.timestamp_ms = Some(now);
        }

        if reading.raw.busy {
            return Err(Error::Busy);
        }

        let device = &mut self.device;
        let verdict = self.monitor.process(
            &reading.corrected,
            reading.raw.bad,
            reading.overflow,
            now,
            || {
                device.confr().write(|w| {
                    w.set_value(COIL_INIT);
                })
            },
        )?;

        match verdict {
            Verdict::Invalid => {
                #[cfg(feature = "defmt")]
                defmt::warn!("YAS537 invalid field (overflow {=u8:b})", reading.overflow.bits());
                measurement.mark_invalid_field();
            }
            Verdict::CoilReinitialized => {
                #[cfg(feature = "defmt")]
                defmt::debug!("YAS537 coil re-initialized at {} ms", now);
            }
            Verdict::Valid | Verdict::Pending => {}
        }

        Ok(Some(measurement))
    }

    /// Run the identity and sensitivity self-test
    ///
    /// Reloads the calibration, checks one single-shot sample and measures the
    /// sensitivity with both forced coil polarities. An enabled session is
    /// restarted in continuous mode afterwards; otherwise the bus is closed.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` without a session
    /// - `Busy` if a single-shot sample was not ready
    /// - `OverflowDetected` / `UnderflowDetected` if a channel saturated
    /// - `DirectionCalcFailed` if the field vector is zero
    /// - `CalibrationInvalid` or `Bus` from the reset sequence
    pub fn self_test(&mut self) -> Result<SelfTestResult, Error<I::Error>> {
        self.ensure_initialized()?;
        let was_enabled = self.enabled;
        if !was_enabled {
            self.open()?;
        }

        let result = self.run_self_test();

        if was_enabled {
            let _ = self.cont_start();
        } else {
            let _ = self.device.interface.close();
        }

        #[cfg(feature = "defmt")]
        if let Ok(r) = &result {
            defmt::info!("YAS537 self-test: sx {} sy {} xyz {}", r.sx, r.sy, r.xyz);
        }

        result
    }

    /// Raw deviation from center of one live sample
    ///
    /// A disabled session is enabled for the sample and disabled again.
    ///
    /// # Errors
    ///
    /// Returns the enable or measurement error.
    pub fn self_test_noise(&mut self) -> Result<[i32; 3], Error<I::Error>> {
        self.ensure_initialized()?;
        let was_enabled = self.enabled;
        if !was_enabled {
            self.set_enable(true)?;
        }

        let result = self.measure();

        if !was_enabled {
            let _ = self.set_enable(false);
        }

        result.map(|_| noise_deviation(&self.last_raw))
    }

    /// Last raw sample `[x, y1, y2, t]`, before correction
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` without a session.
    pub fn last_raw_data(&self) -> Result<[u16; 4], Error<I::Error>> {
        self.ensure_initialized()?;
        Ok(self.last_raw)
    }

    /// Hardware offset snapshot from the last calibration load
    ///
    /// Reads `[-128; 3]` until the device has been enabled once.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` without a session.
    pub fn hardware_offset(&self) -> Result<[i8; 3], Error<I::Error>> {
        self.ensure_initialized()?;
        Ok(self.hard_offset)
    }

    /// Dispatch an extension command
    ///
    /// # Errors
    ///
    /// Returns the error of the selected operation.
    pub fn extension(&mut self, command: ExtCommand) -> Result<ExtResponse, Error<I::Error>> {
        self.ensure_initialized()?;
        match command {
            ExtCommand::SelfTest => self.self_test().map(ExtResponse::SelfTest),
            ExtCommand::SelfTestNoise => self.self_test_noise().map(ExtResponse::Noise),
            ExtCommand::GetLastRawData => self.last_raw_data().map(ExtResponse::LastRawData),
            ExtCommand::GetAverageSample => self.averaging().map(ExtResponse::AverageSample),
            ExtCommand::SetAverageSample(level) => {
                self.set_averaging(level).map(|()| ExtResponse::Done)
            }
            ExtCommand::GetHardwareOffset => self.hardware_offset().map(ExtResponse::HardwareOffset),
        }
    }

    /// Current measurement validity state
    #[must_use]
    pub const fn state(&self) -> MeasurementState {
        self.monitor.state()
    }

    /// Coil monitor (baseline, invalid flag and onset)
    #[must_use]
    pub const fn coil_monitor(&self) -> &CoilMonitor {
        &self.monitor
    }

    /// Correction model from the last calibration load
    #[must_use]
    pub const fn correction_model(&self) -> &CorrectionModel {
        &self.model
    }

    /// Device ID read by `init()`
    #[must_use]
    pub const fn device_id(&self) -> u8 {
        self.device_id
    }

    /// Get a mutable reference to the underlying register device (for advanced usage)
    pub const fn device_mut(&mut self) -> &mut RegisterDevice<I> {
        &mut self.device
    }

    /// Consume the driver and return the underlying interface
    pub fn release(self) -> I {
        self.device.interface
    }

    fn ensure_initialized(&self) -> Result<(), Error<I::Error>> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn open(&mut self) -> Result<(), Error<I::Error>> {
        self.device.interface.open()?;
        self.delay.delay_us(POWER_ON_RESET_US);
        Ok(())
    }

    /// Disable and re-enable so changed settings reach the device
    fn restart(&mut self) -> Result<(), Error<I::Error>> {
        if !self.enabled {
            return Ok(());
        }
        self.set_enable(false)?;
        self.set_enable(true)
    }

    /// Soft reset, calibration load and measurement setup
    fn reset(&mut self) -> Result<(), Error<I::Error>> {
        self.device.srstr().write(|w| {
            w.set_value(SOFT_RESET);
        })?;

        let mut block = [0u8; CALR_LEN];
        // 17 bytes = 136 bits
        self.device.interface.read_register(CALR, 136, &mut block)?;
        let calibration = Calibration::decode(&block).map_err(|_| Error::CalibrationInvalid)?;

        for write in &calibration.trim {
            self.device
                .interface
                .write_register(write.address, 8, &[write.value])?;
        }
        self.model = calibration.model;
        self.hard_offset = calibration.hard_offset;

        #[cfg(feature = "defmt")]
        defmt::debug!("YAS537 calibration version {}", self.model.version());

        let interval = interval_register(self.settings.delay_ms, self.settings.averaging);
        let level = self.settings.averaging.level();

        self.device.adccalr().write(|w| {
            w.set_value(0);
        })?;
        self.device.adccalr_low().write(|w| {
            w.set_value(0);
        })?;
        self.device.trmr().write(|w| {
            w.set_value(TRIM_ENABLE);
        })?;
        self.device.intrvlr().write(|w| {
            w.set_interval(interval);
        })?;
        self.device.avrr().write(|w| {
            w.set_average(level);
            w.set_adc_mode(ADC_MODE);
        })?;
        self.device.confr().write(|w| {
            w.set_value(COIL_INIT);
        })?;
        Ok(())
    }

    fn start(&mut self, ldtc: bool, fors: bool, cont: bool) -> Result<(), Error<I::Error>> {
        self.device.cmdr().write(|w| {
            w.set_start(true);
            w.set_ldtc(ldtc);
            w.set_fors(fors);
            w.set_cont(cont);
        })?;
        Ok(())
    }

    /// Start continuous mode and wait for the first result
    fn cont_start(&mut self) -> Result<(), Error<I::Error>> {
        self.start(false, false, true)?;
        self.delay.delay_us(self.settings.averaging.measure_time_us());
        self.monitor.rearm();
        Ok(())
    }

    fn single_read(&mut self, ldtc: bool, fors: bool) -> Result<Reading, Error<I::Error>> {
        self.start(ldtc, fors, false)?;
        self.delay.delay_us(self.settings.averaging.measure_time_us());
        self.read_sample()
    }

    /// Read `DATAR`, cache the raw channels and apply the correction
    fn read_sample(&mut self) -> Result<Reading, Error<I::Error>> {
        let mut data = [0u8; DATAR_LEN];
        // 8 bytes = 64 bits
        self.device.interface.read_register(DATAR, 64, &mut data)?;

        let raw = RawSample::from_bytes(data);
        self.last_raw = raw.raw_data();
        let corrected = self.model.apply(raw.xy1y2);

        Ok(Reading {
            raw,
            corrected,
            overflow: OverflowMask::from_channels(&corrected),
        })
    }

    fn run_self_test(&mut self) -> Result<SelfTestResult, Error<I::Error>> {
        self.reset()?;

        let reading = self.single_read(false, false)?;
        if reading.raw.busy {
            return Err(Error::Busy);
        }
        let xyz = to_physical(reading.corrected).map(|v| v / 1000);
        if reading.overflow.any_overflow() {
            return Err(Error::OverflowDetected);
        }
        if reading.overflow.any_underflow() {
            return Err(Error::UnderflowDetected);
        }
        if xyz == [0; 3] {
            return Err(Error::DirectionCalcFailed);
        }

        let plus = self.single_read(true, false)?;
        if plus.raw.busy {
            return Err(Error::Busy);
        }
        let minus = self.single_read(true, true)?;
        if minus.raw.busy {
            return Err(Error::Busy);
        }

        let coefficients = self
            .model
            .coefficients()
            .copied()
            .unwrap_or_default();
        let (sx, sy) = sensitivity(&coefficients, &plus.raw.xy1y2, &minus.raw.xy1y2);

        let flags = plus.overflow | minus.overflow;
        if flags.any_overflow() {
            return Err(Error::OverflowDetected);
        }
        if flags.any_underflow() {
            return Err(Error::UnderflowDetected);
        }

        Ok(SelfTestResult {
            id: self.device_id,
            dir: DIRECTION_NOT_COMPUTED,
            sx,
            sy,
            xyz,
        })
    }
}
