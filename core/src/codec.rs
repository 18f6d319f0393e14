//! Two-nibble BCD conversion for the timekeeping registers

use crate::error::{Error, Result};
use crate::registers::{Field, TimeField};

/// Decimal value of a BCD register byte
///
/// Bits outside both masks (flags such as ST or OSCRUN) are ignored.
pub const fn decode_field(raw: u8, units_mask: u8, tens_mask: u8) -> u8 {
    (raw & units_mask) + 10 * ((raw & tens_mask) >> 4)
}

/// BCD register byte for a decimal value
///
/// Only bits inside the two masks are set; callers OR in any flag bits.
pub const fn encode_field(value: u8, units_mask: u8, tens_mask: u8) -> u8 {
    ((value % 10) & units_mask) | (((value / 10) << 4) & tens_mask)
}

impl Field {
    /// Decode this field out of a raw register byte
    pub const fn decode(&self, raw: u8) -> u8 {
        decode_field(raw, self.units_mask, self.tens_mask)
    }

    /// Encode `value`, rejecting values outside the legal range
    pub fn encode(&self, field: TimeField, value: u8) -> Result<u8> {
        if !self.contains(value) {
            return Err(Error::OutOfRange { field, value });
        }
        Ok(encode_field(value, self.units_mask, self.tens_mask))
    }
}
