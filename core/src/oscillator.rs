//! Oscillator start bookkeeping
//!
//! The ST bit shares the seconds register, so every write of the seconds
//! field has to carry it or the crystal stops. [`OscillatorState`] remembers
//! whether the start sequence was issued. It is a cache held by the driver:
//! after a reset or a power loss it starts out `false` again no matter what
//! the chip is doing, and `start_oscillator` re-synchronises it.

use crate::registers::bits;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OscillatorState {
    started: bool,
}

impl OscillatorState {
    pub const fn new() -> Self {
        Self { started: false }
    }

    /// Whether the start sequence was issued since the last reset of the flag
    pub const fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    pub(crate) fn mark_stopped(&mut self) {
        self.started = false;
    }

    /// Seconds register byte for an encoded seconds value
    pub const fn seconds_byte(&self, encoded: u8) -> u8 {
        if self.started {
            encoded | bits::START_OSCILLATOR
        } else {
            encoded
        }
    }
}
