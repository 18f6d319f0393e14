//! Crystal self-calibration
//!
//! The RTCC is stopped and zeroed, then released at the start of a window
//! timed by a local 1 ms tick. When the window closes the elapsed time the
//! RTCC counted is read back and compared with the local count. The drift in
//! ppm is turned into a digital trim value for the trim register.
//!
//! ## Contexts
//!
//! The tick handler runs in interrupt context and only ever calls
//! [`SharedCalibration::on_tick`]. It counts, flips phases and never touches
//! the bus. Writing the start bit at the reference instant is done by the
//! main context once it sees [`CalibrationPhase::Starting`], so the two never
//! contend for the peripheral.
//!
//! ```text
//! Idle -arm-> Armed -tick-> Starting -begin_accumulating-> Accumulating
//!                                                           | window full
//!                                                           v
//!                                                        Settled
//! ```

use core::cell::RefCell;

use critical_section::Mutex;
use hal_abstractions::{TickSource, TwiPeripheral};

use crate::config::CalibrationConfig;
use crate::error::{Result, SaturationError};
use crate::registers::{bits, TimeField};
use crate::report::CalibrationReport;
use crate::rtcc::Mcp7940m;

/// Local tick period driving the window
pub const TICK_PERIOD_MS: u32 = 1;

const TICKS_PER_SECOND: u16 = 1000;

/// Largest trim magnitude the register holds
pub const MAX_TRIM_MAGNITUDE: u32 = bits::TRIM_MAGNITUDE as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationPhase {
    /// No calibration in progress, ticks are ignored
    Idle,
    /// Waiting for the first tick to mark the reference instant
    Armed,
    /// Reference instant reached, main context has to restart the RTCC
    Starting,
    /// Counting the window
    Accumulating,
    /// Window complete, ticks are ignored
    Settled,
}

/// Local side of a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationState {
    phase: CalibrationPhase,
    window_minutes: u32,
    millis: u16,
    seconds: u8,
    minutes: u32,
}

impl CalibrationState {
    pub const fn new() -> Self {
        Self {
            phase: CalibrationPhase::Idle,
            window_minutes: 0,
            millis: 0,
            seconds: 0,
            minutes: 0,
        }
    }

    pub const fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub const fn window_minutes(&self) -> u32 {
        self.window_minutes
    }

    /// Prepare for a run; the next tick marks the reference instant
    pub fn arm(&mut self, window_minutes: u32) {
        *self = Self {
            phase: CalibrationPhase::Armed,
            window_minutes,
            ..Self::new()
        };
    }

    /// Advance by one tick and return the resulting phase
    pub fn on_tick(&mut self) -> CalibrationPhase {
        match self.phase {
            CalibrationPhase::Armed => self.phase = CalibrationPhase::Starting,
            CalibrationPhase::Accumulating => self.count(),
            CalibrationPhase::Idle | CalibrationPhase::Starting | CalibrationPhase::Settled => {}
        }
        self.phase
    }

    fn count(&mut self) {
        self.millis += 1;
        if self.millis < TICKS_PER_SECOND {
            return;
        }
        self.millis = 0;
        self.seconds += 1;
        if self.seconds < 60 {
            return;
        }
        self.seconds = 0;
        self.minutes += 1;
        if self.minutes >= self.window_minutes {
            self.phase = CalibrationPhase::Settled;
        }
    }

    /// Start counting from zero once the RTCC has been restarted
    ///
    /// Ignored outside [`CalibrationPhase::Starting`].
    pub fn begin_accumulating(&mut self) {
        if self.phase == CalibrationPhase::Starting {
            self.millis = 0;
            self.seconds = 0;
            self.minutes = 0;
            self.phase = CalibrationPhase::Accumulating;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whole seconds counted so far
    pub const fn local_elapsed_seconds(&self) -> u32 {
        self.minutes * 60 + self.seconds as u32
    }
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Calibration state shared between the tick interrupt and the main context
pub struct SharedCalibration {
    state: Mutex<RefCell<CalibrationState>>,
}

impl SharedCalibration {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(CalibrationState::new())),
        }
    }

    /// Tick handler entry point
    pub fn on_tick(&self) -> CalibrationPhase {
        self.with(|state| state.on_tick())
    }

    pub fn snapshot(&self) -> CalibrationState {
        self.with(|state| *state)
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.with(|state| state.phase())
    }

    pub fn arm(&self, window_minutes: u32) {
        self.with(|state| state.arm(window_minutes));
    }

    pub fn begin_accumulating(&self) {
        self.with(|state| state.begin_accumulating());
    }

    pub fn reset(&self) {
        self.with(|state| state.reset());
    }

    fn with<R>(&self, f: impl FnOnce(&mut CalibrationState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow(cs).borrow_mut()))
    }
}

impl Default for SharedCalibration {
    fn default() -> Self {
        Self::new()
    }
}

/// Digital trim register value
///
/// Bit 7 selects the direction, bits 6..0 the magnitude. The direction bit is
/// set when the local reference counted more seconds than the RTCC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrimValue {
    pub magnitude: u8,
    pub direction_bit: bool,
    /// Requested magnitude did not fit, `magnitude` is meaningless
    pub saturated: bool,
}

impl TrimValue {
    /// No trimming
    pub const NEUTRAL: Self = Self::new(0, false);

    /// In-range trim value; the magnitude is truncated to 7 bits
    pub const fn new(magnitude: u8, direction_bit: bool) -> Self {
        Self {
            magnitude: magnitude & bits::TRIM_MAGNITUDE,
            direction_bit,
            saturated: false,
        }
    }

    pub const fn from_register(raw: u8) -> Self {
        Self::new(raw & bits::TRIM_MAGNITUDE, raw & bits::TRIM_SIGN != 0)
    }

    pub const fn to_register(&self) -> u8 {
        let sign = if self.direction_bit { bits::TRIM_SIGN } else { 0 };
        sign | (self.magnitude & bits::TRIM_MAGNITUDE)
    }
}

impl core::fmt::Display for TrimValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0b{:08b}", self.to_register())
    }
}

/// Elapsed time as counted by the RTCC over a window
///
/// `days` is how far the date register moved past the 1st, so a window of a
/// full day or more does not wrap back to zero hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ElapsedTime {
    pub days: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl ElapsedTime {
    pub const fn total_hours(&self) -> u32 {
        self.days as u32 * 24 + self.hours as u32
    }

    pub const fn total_seconds(&self) -> u32 {
        self.total_hours() * 3600 + self.minutes as u32 * 60 + self.seconds as u32
    }
}

impl core::fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} hours, {} minutes and {} seconds",
            self.total_hours(),
            self.minutes,
            self.seconds
        )
    }
}

/// Seconds counted by both sides over one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationSample {
    pub local_seconds: u32,
    pub rtcc_seconds: u32,
}

impl CalibrationSample {
    pub const fn new(local_seconds: u32, rtcc_seconds: u32) -> Self {
        Self {
            local_seconds,
            rtcc_seconds,
        }
    }

    /// Drift of the RTCC against the local reference, truncated
    pub fn ppm(&self) -> u32 {
        let delta = u64::from(self.local_seconds.abs_diff(self.rtcc_seconds));
        (delta * 1_000_000)
            .checked_div(u64::from(self.local_seconds))
            .map_or(u32::MAX, saturate_u32)
    }

    /// Trim magnitude needed to cancel the drift, before range checking
    pub fn requested_magnitude(&self, config: &CalibrationConfig) -> u32 {
        let cycles = u64::from(self.ppm()) * u64::from(config.reference_frequency_hz) * 60;
        cycles
            .checked_div(1_000_000 * u64::from(config.cycles_per_trim_lsb))
            .map_or(u32::MAX, saturate_u32)
    }

    pub fn trim(&self, config: &CalibrationConfig) -> TrimValue {
        compute_trim(self.local_seconds, self.rtcc_seconds, config)
    }
}

fn saturate_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Trim value for an RTCC that counted `rtcc_seconds` while the reference
/// counted `local_seconds`
///
/// A magnitude over 127 yields a value with `saturated` set.
pub fn compute_trim(local_seconds: u32, rtcc_seconds: u32, config: &CalibrationConfig) -> TrimValue {
    let sample = CalibrationSample::new(local_seconds, rtcc_seconds);
    let magnitude = sample.requested_magnitude(config);
    let direction_bit = local_seconds > rtcc_seconds;
    match u8::try_from(magnitude) {
        Ok(m) if u32::from(m) <= MAX_TRIM_MAGNITUDE => TrimValue::new(m, direction_bit),
        _ => TrimValue {
            magnitude: 0,
            direction_bit,
            saturated: true,
        },
    }
}

impl CalibrationReport {
    /// Trim value, or [`Error::Saturated`](crate::Error::Saturated) with the
    /// magnitude that did not fit
    pub fn outcome(&self) -> Result<TrimValue> {
        if self.trim.saturated {
            Err(SaturationError {
                magnitude: self.requested_magnitude,
                ppm: self.ppm,
            }
            .into())
        } else {
            Ok(self.trim)
        }
    }
}

/// One calibration run over a tick source
pub struct CalibrationEngine<'a, T> {
    shared: &'a SharedCalibration,
    ticks: T,
    config: CalibrationConfig,
}

impl<'a, T: TickSource> CalibrationEngine<'a, T> {
    pub fn new(shared: &'a SharedCalibration, ticks: T, config: CalibrationConfig) -> Self {
        Self {
            shared,
            ticks,
            config,
        }
    }

    /// Give the tick source back
    pub fn release(self) -> T {
        self.ticks
    }

    /// Measure one window and compute the trim value
    ///
    /// Blocks for the whole window. The RTCC time is clobbered: seconds,
    /// minutes and hours hold the elapsed time afterwards and the date is
    /// one plus the number of whole days elapsed. On error the tick
    /// source is disarmed and the shared state returns to idle; the RTCC is
    /// left however far the run got.
    pub fn run<P: TwiPeripheral>(&mut self, rtcc: &mut Mcp7940m<P>) -> Result<CalibrationReport> {
        self.config.validate()?;
        let result = self.measure(rtcc);
        self.ticks.disarm();
        self.shared.reset();
        if let Err(e) = &result {
            error!("Calibration aborted: {}", e);
        }
        result
    }

    fn measure<P: TwiPeripheral>(&mut self, rtcc: &mut Mcp7940m<P>) -> Result<CalibrationReport> {
        info!(
            "Calibrating RTCC over {} minutes",
            self.config.window_minutes
        );
        rtcc.halt_clock()?;
        self.shared.arm(self.config.window_minutes);
        self.ticks.arm(TICK_PERIOD_MS);

        loop {
            match self.shared.phase() {
                CalibrationPhase::Starting => {
                    rtcc.restart_clock()?;
                    self.shared.begin_accumulating();
                    debug!("RTCC released, window open");
                }
                CalibrationPhase::Settled => break,
                _ => self.ticks.wait(),
            }
        }
        self.ticks.disarm();

        let elapsed = ElapsedTime {
            seconds: rtcc.read_field(TimeField::Seconds)?,
            minutes: rtcc.read_field(TimeField::Minutes)?,
            hours: rtcc.read_field(TimeField::Hours)?,
            days: rtcc.read_field(TimeField::Date)?.saturating_sub(1),
        };
        let local_seconds = self.shared.snapshot().local_elapsed_seconds();
        let sample = CalibrationSample::new(local_seconds, elapsed.total_seconds());
        let report = CalibrationReport::new(sample, elapsed, &self.config);
        info!(
            "Window closed: local {}s, RTCC {}s, {} ppm",
            sample.local_seconds, sample.rtcc_seconds, report.ppm
        );
        Ok(report)
    }
}

impl<P: TwiPeripheral> Mcp7940m<P> {
    /// Run a blocking calibration with the given tick source
    ///
    /// The trim register is left untouched; apply the outcome with
    /// [`set_trim`](Self::set_trim).
    pub fn run_calibration<T: TickSource>(
        &mut self,
        shared: &SharedCalibration,
        ticks: T,
        config: CalibrationConfig,
    ) -> Result<CalibrationReport> {
        CalibrationEngine::new(shared, ticks, config).run(self)
    }
}
