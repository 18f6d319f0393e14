//! Clock/calendar value held by the RTCC

use crate::error::{Error, Result};
use crate::registers::TimeField;

/// Time and date as stored by the chip
///
/// 24 hour clock, two-digit year. The chip does no date arithmetic on our
/// behalf beyond rolling the registers over, and neither does this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtccTime {
    /// 0-59
    pub seconds: u8,
    /// 0-59
    pub minutes: u8,
    /// 0-23
    pub hours: u8,
    /// 1-7
    pub weekday: u8,
    /// 1-31
    pub date: u8,
    /// 1-12
    pub month: u8,
    /// 0-99, years since 2000
    pub year: u8,
}

impl RtccTime {
    /// Earliest value the registers can hold: 00:00:00, day 1, 01.01.2000
    pub const MIN: Self = Self {
        seconds: 0,
        minutes: 0,
        hours: 0,
        weekday: 1,
        date: 1,
        month: 1,
        year: 0,
    };

    /// Latest value of every field: 23:59:59, day 7, 31.12.2099
    pub const MAX: Self = Self {
        seconds: 59,
        minutes: 59,
        hours: 23,
        weekday: 7,
        date: 31,
        month: 12,
        year: 99,
    };

    pub const fn get(&self, field: TimeField) -> u8 {
        match field {
            TimeField::Seconds => self.seconds,
            TimeField::Minutes => self.minutes,
            TimeField::Hours => self.hours,
            TimeField::Weekday => self.weekday,
            TimeField::Date => self.date,
            TimeField::Month => self.month,
            TimeField::Year => self.year,
        }
    }

    pub fn set(&mut self, field: TimeField, value: u8) {
        match field {
            TimeField::Seconds => self.seconds = value,
            TimeField::Minutes => self.minutes = value,
            TimeField::Hours => self.hours = value,
            TimeField::Weekday => self.weekday = value,
            TimeField::Date => self.date = value,
            TimeField::Month => self.month = value,
            TimeField::Year => self.year = value,
        }
    }

    /// Check every field against its legal range
    ///
    /// Only per-field ranges are checked; 31.02. passes.
    pub fn validate(&self) -> Result<()> {
        for field in TimeField::ALL {
            let value = self.get(field);
            if !field.field().contains(value) {
                return Err(Error::OutOfRange { field, value });
            }
        }
        Ok(())
    }
}

impl Default for RtccTime {
    fn default() -> Self {
        Self::MIN
    }
}

impl core::fmt::Display for RtccTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02} {:02}.{:02}.{} (day {})",
            self.hours,
            self.minutes,
            self.seconds,
            self.date,
            self.month,
            2000 + self.year as u16,
            self.weekday
        )
    }
}
