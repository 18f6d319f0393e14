//! Operating mode selection

use core::str::FromStr;

use crate::calibration::TrimValue;
use crate::config::CalibrationConfig;
use crate::time::RtccTime;

/// What the firmware does after bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeKind {
    /// Measure crystal drift and report a trim value
    Calibrate,
    /// Program a fixed time and trim value
    SetTime,
    /// Keep time
    Run,
}

impl ModeKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Calibrate => "calibrate",
            Self::SetTime => "set-time",
            Self::Run => "run",
        }
    }
}

impl core::fmt::Display for ModeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mode name not recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnknownMode;

impl core::fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("unknown mode, expected calibrate, set-time or run")
    }
}

impl core::error::Error for UnknownMode {}

impl FromStr for ModeKind {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("calibrate") {
            Ok(Self::Calibrate)
        } else if s.eq_ignore_ascii_case("set-time") || s.eq_ignore_ascii_case("set_time") {
            Ok(Self::SetTime)
        } else if s.eq_ignore_ascii_case("run") {
            Ok(Self::Run)
        } else {
            Err(UnknownMode)
        }
    }
}

/// Mode together with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    Calibrate { config: CalibrationConfig },
    SetTime { time: RtccTime, trim: TrimValue },
    Run,
}

impl OperatingMode {
    /// Combine a parsed mode with the parameters available to the board
    pub fn from_kind(
        kind: ModeKind,
        calibration: CalibrationConfig,
        time: RtccTime,
        trim: TrimValue,
    ) -> Self {
        match kind {
            ModeKind::Calibrate => Self::Calibrate {
                config: calibration,
            },
            ModeKind::SetTime => Self::SetTime { time, trim },
            ModeKind::Run => Self::Run,
        }
    }

    pub const fn kind(&self) -> ModeKind {
        match self {
            Self::Calibrate { .. } => ModeKind::Calibrate,
            Self::SetTime { .. } => ModeKind::SetTime,
            Self::Run => ModeKind::Run,
        }
    }
}
