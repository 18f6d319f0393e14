//! MCP7940M register map
//!
//! Timekeeping registers hold two-nibble BCD values. Each time field is
//! described by a [`Field`]: the register it lives in, the masks selecting
//! its units and tens digits, and its legal decimal range. Bits outside both
//! masks carry control or status flags (see [`bits`]).

/// 7-bit slave address of the MCP7940M
pub const SLAVE_ADDRESS: u8 = 0b110_1111;

/// Register addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// Seconds, oscillator start bit
    Seconds = 0x00,
    Minutes = 0x01,
    /// Hours, 12/24 h select
    Hours = 0x02,
    /// Weekday, oscillator running status
    Weekday = 0x03,
    Date = 0x04,
    /// Month, leap year flag
    Month = 0x05,
    Year = 0x06,
    Control = 0x07,
    /// Digital trim (OSCTRIM)
    Trim = 0x08,
}

impl Register {
    /// Address byte sent after SLA+W
    pub const fn address(self) -> u8 {
        self as u8
    }
}

/// Flag bits sharing registers with the BCD fields
pub mod bits {
    /// Oscillator start, seconds register
    pub const START_OSCILLATOR: u8 = 1 << 7;
    /// Oscillator running (read only), weekday register
    pub const OSCILLATOR_RUNNING: u8 = 1 << 5;
    /// 12 hour format select, hours register
    pub const HOUR_FORMAT_12: u8 = 1 << 6;
    /// Leap year (read only), month register
    pub const LEAP_YEAR: u8 = 1 << 5;
    /// Trim direction, trim register
    pub const TRIM_SIGN: u8 = 1 << 7;
    /// Trim magnitude, trim register
    pub const TRIM_MAGNITUDE: u8 = 0x7F;
}

/// Time and date fields, in register order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeField {
    Seconds,
    Minutes,
    Hours,
    Weekday,
    Date,
    Month,
    Year,
}

impl TimeField {
    /// All fields in the order they are written by `set_time`
    pub const ALL: [TimeField; 7] = [
        TimeField::Seconds,
        TimeField::Minutes,
        TimeField::Hours,
        TimeField::Weekday,
        TimeField::Date,
        TimeField::Month,
        TimeField::Year,
    ];

    /// Register layout of this field
    pub const fn field(self) -> Field {
        match self {
            TimeField::Seconds => Field::new(Register::Seconds, 0x0F, 0x70, 0, 59),
            TimeField::Minutes => Field::new(Register::Minutes, 0x0F, 0x70, 0, 59),
            TimeField::Hours => Field::new(Register::Hours, 0x0F, 0x30, 0, 23),
            // WKDAY occupies bits 0-2; bit 5 is OSCRUN
            TimeField::Weekday => Field::new(Register::Weekday, 0x07, 0x00, 1, 7),
            TimeField::Date => Field::new(Register::Date, 0x0F, 0x30, 1, 31),
            TimeField::Month => Field::new(Register::Month, 0x0F, 0x10, 1, 12),
            TimeField::Year => Field::new(Register::Year, 0x0F, 0xF0, 0, 99),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            TimeField::Seconds => "seconds",
            TimeField::Minutes => "minutes",
            TimeField::Hours => "hours",
            TimeField::Weekday => "weekday",
            TimeField::Date => "date",
            TimeField::Month => "month",
            TimeField::Year => "year",
        }
    }
}

impl core::fmt::Display for TimeField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// BCD layout of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    pub register: Register,
    /// Units digit, bits 0-3 (narrower for some fields)
    pub units_mask: u8,
    /// Tens digit, bits 4-7 (zero when the field has no tens digit)
    pub tens_mask: u8,
    /// Smallest legal decimal value
    pub min: u8,
    /// Largest legal decimal value
    pub max: u8,
}

impl Field {
    pub const fn new(register: Register, units_mask: u8, tens_mask: u8, min: u8, max: u8) -> Self {
        Self {
            register,
            units_mask,
            tens_mask,
            min,
            max,
        }
    }

    /// Whether `value` lies in the field's legal decimal range
    pub const fn contains(&self, value: u8) -> bool {
        value >= self.min && value <= self.max
    }
}
