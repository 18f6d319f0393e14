//! Driver error types

use hal_abstractions::TransactionStatus;

use crate::bus::Phase;
use crate::registers::TimeField;

/// Calibration result whose trim magnitude does not fit the trim register
///
/// A normal outcome for short windows: sub-second drift over a few minutes
/// already exceeds the 7-bit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SaturationError {
    /// Trim magnitude the measurement asked for
    pub magnitude: u32,
    /// Drift in parts per million
    pub ppm: u32,
}

impl core::fmt::Display for SaturationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "trim magnitude {} out of range ({} ppm drift)",
            self.magnitude, self.ppm
        )
    }
}

impl core::error::Error for SaturationError {}

/// RTCC driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A bus phase observed a status other than the one it expects
    Protocol {
        phase: Phase,
        observed: TransactionStatus,
    },
    /// Completion flag never rose within the poll limit
    BusTimeout(Phase),
    /// Computed trim does not fit the trim register
    Saturated(SaturationError),
    /// Field value outside its legal decimal range
    OutOfRange { field: TimeField, value: u8 },
    /// Calibration window (minutes) outside the supported range
    InvalidWindow(u32),
}

impl Error {
    /// Observed bus status, for protocol errors
    pub fn status(&self) -> Option<TransactionStatus> {
        match self {
            Self::Protocol { observed, .. } => Some(*observed),
            _ => None,
        }
    }
}

impl From<SaturationError> for Error {
    fn from(err: SaturationError) -> Self {
        Self::Saturated(err)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Protocol { phase, observed } => {
                write!(f, "{} phase failed: {}", phase, observed)
            }
            Self::BusTimeout(phase) => write!(f, "{} phase timed out", phase),
            Self::Saturated(err) => write!(f, "Calibration saturated: {}", err),
            Self::OutOfRange { field, value } => {
                write!(f, "{} value {} out of range", field, value)
            }
            Self::InvalidWindow(minutes) => {
                write!(f, "Calibration window of {} minutes not supported", minutes)
            }
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for Error {}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

        match self {
            Self::Protocol { observed, .. } => match observed {
                TransactionStatus::AddressWriteNack | TransactionStatus::AddressReadNack => {
                    ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
                }
                TransactionStatus::DataSentNack => {
                    ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
                }
                TransactionStatus::ArbitrationLost => ErrorKind::ArbitrationLoss,
                TransactionStatus::BusError => ErrorKind::Bus,
                _ => ErrorKind::Other,
            },
            _ => ErrorKind::Other,
        }
    }
}

/// Result type returned by the driver
pub type Result<T> = core::result::Result<T, Error>;
