//! Two-wire master transaction primitives
//!
//! [`Transport`] drives one bus phase at a time on a [`TwiPeripheral`]:
//! it starts the action, polls the completion flag and compares the status
//! the hardware reports with the one the phase expects. A mismatch is
//! returned as [`Error::Protocol`] carrying the observed status.
//!
//! ## Polling
//!
//! The completion flag is polled at most `poll_limit` times before the phase
//! fails with [`Error::BusTimeout`]. A limit of `None` polls forever, which
//! hangs on a wedged bus exactly like a bare busy-wait would.

use hal_abstractions::{Action, TransactionStatus, TwiPeripheral};

use crate::error::{Error, Result};

/// Bus phase, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Start,
    RepeatedStart,
    Stop,
    AddressWrite,
    AddressRead,
    TransmitByte,
    ReceiveByte,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::RepeatedStart => "repeated start",
            Self::Stop => "stop",
            Self::AddressWrite => "SLA+W",
            Self::AddressRead => "SLA+R",
            Self::TransmitByte => "transmit",
            Self::ReceiveByte => "receive",
        };
        f.write_str(name)
    }
}

/// Transfer direction appended to the slave address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Write,
    Read,
}

impl Direction {
    /// Low bit of the address byte
    pub const fn bit(self) -> u8 {
        match self {
            Direction::Write => 0,
            Direction::Read => 1,
        }
    }
}

/// Address byte for a 7-bit slave address and a direction
pub const fn address_byte(address: u8, direction: Direction) -> u8 {
    (address << 1) | direction.bit()
}

/// Phase-level master on top of a two-wire peripheral
pub struct Transport<P> {
    twi: P,
    poll_limit: Option<u32>,
}

impl<P: TwiPeripheral> Transport<P> {
    pub fn new(twi: P, poll_limit: Option<u32>) -> Self {
        Self { twi, poll_limit }
    }

    /// Give the peripheral back
    pub fn release(self) -> P {
        self.twi
    }

    /// Generate a START and expect the start status
    pub fn start(&mut self) -> Result<()> {
        self.run(Action::Start, Phase::Start, TransactionStatus::Start)
    }

    /// Generate a repeated START and expect the repeated start status
    ///
    /// Same signalling as [`start`](Self::start), different expected status.
    pub fn repeated_start(&mut self) -> Result<()> {
        self.run(
            Action::Start,
            Phase::RepeatedStart,
            TransactionStatus::RepeatedStart,
        )
    }

    /// Generate a STOP
    ///
    /// A stop condition has no acknowledge phase, so nothing is awaited and
    /// the call always succeeds.
    pub fn stop(&mut self) -> Result<()> {
        self.twi.begin(Action::Stop);
        Ok(())
    }

    /// Transmit SLA+R or SLA+W and expect the matching ACK status
    pub fn send_address(&mut self, address: u8, direction: Direction) -> Result<()> {
        self.twi.load_data(address_byte(address, direction));
        match direction {
            Direction::Write => self.run(
                Action::Transmit,
                Phase::AddressWrite,
                TransactionStatus::AddressWriteAck,
            ),
            Direction::Read => self.run(
                Action::Transmit,
                Phase::AddressRead,
                TransactionStatus::AddressReadAck,
            ),
        }
    }

    /// Transmit one data byte and expect it to be acknowledged
    pub fn send_byte(&mut self, byte: u8) -> Result<()> {
        self.twi.load_data(byte);
        self.run(
            Action::Transmit,
            Phase::TransmitByte,
            TransactionStatus::DataSentAck,
        )
    }

    /// Receive the single byte of a read, answering it with NACK
    ///
    /// NACK after the byte ends the read burst; "received, acknowledged" is
    /// therefore an error here.
    pub fn receive_byte(&mut self) -> Result<u8> {
        self.run(
            Action::ReceiveNack,
            Phase::ReceiveByte,
            TransactionStatus::DataReceivedNack,
        )?;
        Ok(self.twi.read_data())
    }

    fn run(&mut self, action: Action, phase: Phase, expected: TransactionStatus) -> Result<()> {
        self.twi.begin(action);
        self.wait(phase)?;
        let observed = self.twi.status();
        if observed == expected {
            Ok(())
        } else {
            Err(Error::Protocol { phase, observed })
        }
    }

    fn wait(&mut self, phase: Phase) -> Result<()> {
        match self.poll_limit {
            None => {
                while !self.twi.is_complete() {
                    core::hint::spin_loop();
                }
                Ok(())
            }
            Some(limit) => {
                for _ in 0..limit {
                    if self.twi.is_complete() {
                        return Ok(());
                    }
                }
                Err(Error::BusTimeout(phase))
            }
        }
    }
}
