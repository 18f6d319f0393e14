//! Calibration outcome and its human-readable form

use core::fmt::Write;

use heapless::String;

use crate::calibration::{CalibrationSample, ElapsedTime, TrimValue};
use crate::config::CalibrationConfig;

/// Room for the longest rendered report
pub const REPORT_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationReport {
    pub sample: CalibrationSample,
    /// Elapsed time as read from the RTCC
    pub elapsed: ElapsedTime,
    pub ppm: u32,
    pub requested_magnitude: u32,
    pub trim: TrimValue,
}

impl CalibrationReport {
    pub fn new(sample: CalibrationSample, elapsed: ElapsedTime, config: &CalibrationConfig) -> Self {
        Self {
            sample,
            elapsed,
            ppm: sample.ppm(),
            requested_magnitude: sample.requested_magnitude(config),
            trim: sample.trim(config),
        }
    }

    /// One-line summary for the console
    pub fn render(&self) -> String<REPORT_CAPACITY> {
        let mut text = String::new();
        // Capacity covers the worst case, a failed write only truncates.
        let _ = write!(text, "{}", self);
        text
    }
}

impl core::fmt::Display for CalibrationReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.trim.saturated {
            f.write_str("Crystal could not be calibrated, deviation too large")?;
        } else {
            write!(f, "Calculated calibration value: {}", self.trim)?;
        }
        write!(f, "; Elapsed time was: {}", self.elapsed)
    }
}
