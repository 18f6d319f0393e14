//! Single-register transactions with the RTCC
//!
//! Two transaction shapes cover every access the driver makes:
//!
//! ```text
//! read:  S  SLA+W  reg  Sr  SLA+R  data(NACK)  P
//! write: S  SLA+W  reg  data  P
//! ```
//!
//! The first failing phase aborts the transaction and its error is returned
//! as is. Phases already issued are not undone and nothing is retried.

use hal_abstractions::TwiPeripheral;

use crate::bus::{Direction, Transport};
use crate::error::Result;
use crate::registers::Register;

/// Register-level access to one slave on the bus
pub struct RegisterChannel<P> {
    transport: Transport<P>,
    address: u8,
}

impl<P: TwiPeripheral> RegisterChannel<P> {
    pub fn new(transport: Transport<P>, address: u8) -> Self {
        Self { transport, address }
    }

    /// Give the peripheral back
    pub fn release(self) -> P {
        self.transport.release()
    }

    /// Random read of one register
    pub fn read_byte(&mut self, register: Register) -> Result<u8> {
        let result = self.read_phases(register);
        match result {
            Ok(value) => trace!("read {} = {=u8:#x}", register, value),
            Err(e) => warn!("read of {} aborted: {}", register, e),
        }
        result
    }

    /// Write one register
    pub fn write_byte(&mut self, register: Register, value: u8) -> Result<()> {
        let result = self.write_phases(register, value);
        match result {
            Ok(()) => trace!("wrote {} = {=u8:#x}", register, value),
            Err(e) => warn!("write of {} aborted: {}", register, e),
        }
        result
    }

    fn read_phases(&mut self, register: Register) -> Result<u8> {
        self.transport.start()?;
        self.transport.send_address(self.address, Direction::Write)?;
        self.transport.send_byte(register.address())?;
        self.transport.repeated_start()?;
        self.transport.send_address(self.address, Direction::Read)?;
        let value = self.transport.receive_byte()?;
        self.transport.stop()?;
        Ok(value)
    }

    fn write_phases(&mut self, register: Register, value: u8) -> Result<()> {
        self.transport.start()?;
        self.transport.send_address(self.address, Direction::Write)?;
        self.transport.send_byte(register.address())?;
        self.transport.send_byte(value)?;
        self.transport.stop()
    }
}
