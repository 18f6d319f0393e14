//! Two-wire (TWI/I2C) master peripheral at register level
//!
//! The trait mirrors what a master-mode TWI block exposes: a way to kick off
//! one bus action, a completion flag, a status code describing what the bus
//! did, and a data register. Waiting on the flag and judging the status is
//! left to the caller so the protocol sequencing stays hardware independent.

use core::fmt;

/// One bus action requested from the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Generate a START, or a repeated START when the bus is already owned
    Start,
    /// Generate a STOP. Has no completion phase.
    Stop,
    /// Shift out the byte last loaded with [`TwiPeripheral::load_data`]
    Transmit,
    /// Clock in one byte and answer it with ACK
    ReceiveAck,
    /// Clock in one byte and answer it with NACK (last byte of a read)
    ReceiveNack,
}

/// Bus state reported by the peripheral after an action completed
///
/// Codes follow the standard master-mode TWI status table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransactionStatus {
    /// Illegal START or STOP seen on the bus (0x00)
    BusError,
    /// START transmitted (0x08)
    Start,
    /// Repeated START transmitted (0x10)
    RepeatedStart,
    /// SLA+W transmitted, ACK received (0x18)
    AddressWriteAck,
    /// SLA+W transmitted, NACK received (0x20)
    AddressWriteNack,
    /// Data byte transmitted, ACK received (0x28)
    DataSentAck,
    /// Data byte transmitted, NACK received (0x30)
    DataSentNack,
    /// Arbitration lost (0x38)
    ArbitrationLost,
    /// SLA+R transmitted, ACK received (0x40)
    AddressReadAck,
    /// SLA+R transmitted, NACK received (0x48)
    AddressReadNack,
    /// Data byte received, ACK returned (0x50)
    DataReceivedAck,
    /// Data byte received, NACK returned (0x58)
    DataReceivedNack,
    /// Whole operation completed (0xD0)
    Success,
    /// No relevant state information (0xF8)
    NoInfo,
    /// Any other code, kept verbatim
    Unknown(u8),
}

impl TransactionStatus {
    /// Prescaler bits share the status register on most TWI blocks
    const STATUS_MASK: u8 = 0xF8;

    /// Classify a raw status register value
    pub const fn from_code(code: u8) -> Self {
        match code & Self::STATUS_MASK {
            0x00 => Self::BusError,
            0x08 => Self::Start,
            0x10 => Self::RepeatedStart,
            0x18 => Self::AddressWriteAck,
            0x20 => Self::AddressWriteNack,
            0x28 => Self::DataSentAck,
            0x30 => Self::DataSentNack,
            0x38 => Self::ArbitrationLost,
            0x40 => Self::AddressReadAck,
            0x48 => Self::AddressReadNack,
            0x50 => Self::DataReceivedAck,
            0x58 => Self::DataReceivedNack,
            0xD0 => Self::Success,
            0xF8 => Self::NoInfo,
            _ => Self::Unknown(code),
        }
    }

    /// Raw status code
    pub const fn code(self) -> u8 {
        match self {
            Self::BusError => 0x00,
            Self::Start => 0x08,
            Self::RepeatedStart => 0x10,
            Self::AddressWriteAck => 0x18,
            Self::AddressWriteNack => 0x20,
            Self::DataSentAck => 0x28,
            Self::DataSentNack => 0x30,
            Self::ArbitrationLost => 0x38,
            Self::AddressReadAck => 0x40,
            Self::AddressReadNack => 0x48,
            Self::DataReceivedAck => 0x50,
            Self::DataReceivedNack => 0x58,
            Self::Success => 0xD0,
            Self::NoInfo => 0xF8,
            Self::Unknown(code) => code,
        }
    }
}

impl From<u8> for TransactionStatus {
    fn from(code: u8) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BusError => "bus error",
            Self::Start => "start transmitted",
            Self::RepeatedStart => "repeated start transmitted",
            Self::AddressWriteAck => "SLA+W acknowledged",
            Self::AddressWriteNack => "SLA+W not acknowledged",
            Self::DataSentAck => "data sent, acknowledged",
            Self::DataSentNack => "data sent, not acknowledged",
            Self::ArbitrationLost => "arbitration lost",
            Self::AddressReadAck => "SLA+R acknowledged",
            Self::AddressReadNack => "SLA+R not acknowledged",
            Self::DataReceivedAck => "data received, acknowledged",
            Self::DataReceivedNack => "data received, not acknowledged",
            Self::Success => "success",
            Self::NoInfo => "no state information",
            Self::Unknown(_) => "unknown status",
        };
        write!(f, "{} (0x{:02X})", text, self.code())
    }
}

/// Master-mode two-wire peripheral
///
/// # Invariants
///
/// - Exactly one owner drives the peripheral; calls are never interleaved
///   from an interrupt handler.
/// - After [`begin`](Self::begin) the completion flag reads `false` until the
///   hardware finished the action, except for [`Action::Stop`] which has no
///   completion phase.
pub trait TwiPeripheral {
    /// Start one bus action. Clears the completion flag.
    fn begin(&mut self, action: Action);

    /// Completion flag of the action started last
    fn is_complete(&mut self) -> bool;

    /// Status observed when the last action completed
    fn status(&mut self) -> TransactionStatus;

    /// Load the data register ahead of [`Action::Transmit`]
    fn load_data(&mut self, byte: u8);

    /// Read the data register after a receive action completed
    fn read_data(&mut self) -> u8;
}

impl<T: TwiPeripheral + ?Sized> TwiPeripheral for &mut T {
    fn begin(&mut self, action: Action) {
        (**self).begin(action)
    }

    fn is_complete(&mut self) -> bool {
        (**self).is_complete()
    }

    fn status(&mut self) -> TransactionStatus {
        (**self).status()
    }

    fn load_data(&mut self, byte: u8) {
        (**self).load_data(byte)
    }

    fn read_data(&mut self) -> u8 {
        (**self).read_data()
    }
}
