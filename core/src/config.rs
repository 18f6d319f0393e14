//! Driver and calibration configuration

use crate::error::{Error, Result};
use crate::registers::SLAVE_ADDRESS;

/// Default completion-flag poll bound per bus phase
///
/// A byte at 100 kHz takes ~90 us; this leaves a wide margin on any core
/// clock the driver is likely to run on.
pub const DEFAULT_POLL_LIMIT: u32 = 100_000;

/// Longest supported calibration window (minutes)
///
/// A full day; past midnight the elapsed time is carried by the date
/// register, which the run sets to the 1st before the window opens.
pub const MAX_WINDOW_MINUTES: u32 = 24 * 60;

/// Bus access configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtccConfig {
    /// 7-bit slave address
    pub address: u8,
    /// Poll bound per bus phase, `None` waits forever
    pub poll_limit: Option<u32>,
}

impl Default for RtccConfig {
    fn default() -> Self {
        Self {
            address: SLAVE_ADDRESS,
            poll_limit: Some(DEFAULT_POLL_LIMIT),
        }
    }
}

/// Calibration run configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConfig {
    /// Measurement window in minutes (24 hours recommended)
    pub window_minutes: u32,
    /// Nominal crystal frequency
    pub reference_frequency_hz: u32,
    /// Oscillator cycles added or removed per minute for one trim LSB
    pub cycles_per_trim_lsb: u32,
}

impl CalibrationConfig {
    pub const fn with_window(window_minutes: u32) -> Self {
        Self {
            window_minutes,
            reference_frequency_hz: 32_768,
            cycles_per_trim_lsb: 2,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_minutes == 0 || self.window_minutes > MAX_WINDOW_MINUTES {
            return Err(Error::InvalidWindow(self.window_minutes));
        }
        Ok(())
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::with_window(MAX_WINDOW_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let rtcc = RtccConfig::default();
        assert_eq!(rtcc.address, 0x6F);
        assert_eq!(rtcc.poll_limit, Some(DEFAULT_POLL_LIMIT));

        let cal = CalibrationConfig::default();
        assert_eq!(cal.window_minutes, 1440);
        assert_eq!(cal.reference_frequency_hz, 32_768);
        assert_eq!(cal.cycles_per_trim_lsb, 2);
        assert!(cal.validate().is_ok());
    }

    #[test]
    fn test_window_bounds() {
        assert_eq!(
            CalibrationConfig::with_window(0).validate(),
            Err(Error::InvalidWindow(0))
        );
        assert!(CalibrationConfig::with_window(1).validate().is_ok());
        assert_eq!(
            CalibrationConfig::with_window(1441).validate(),
            Err(Error::InvalidWindow(1441))
        );
    }
}
