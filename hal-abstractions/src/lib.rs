//! Hardware abstraction traits for the RTCC firmware
//!
//! This crate defines traits that abstract over hardware differences
//! between boards. BSPs implement these traits; `rtcc-core` builds the
//! RTCC protocol and the calibration procedure on top of them.

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod tick;
pub mod twi;

pub use tick::TickSource;
pub use twi::{Action, TransactionStatus, TwiPeripheral};
