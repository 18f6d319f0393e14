//! Platform-agnostic MCP7940M driver and crystal calibration
//!
//! This crate contains the RTCC protocol and the calibration procedure that
//! every supported board shares. It has NO hardware dependencies: boards
//! provide a [`TwiPeripheral`](hal_abstractions::TwiPeripheral) and a
//! [`TickSource`](hal_abstractions::TickSource).
//!
//! ## Layers
//!
//! - [`bus`]: one bus phase at a time, status checked, bounded wait
//! - [`channel`]: single-register read and write transactions
//! - [`codec`] and [`registers`]: BCD fields and the register map
//! - [`rtcc`]: the driver proper
//! - [`calibration`]: drift measurement and trim computation

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

#[macro_use]
mod fmt;

pub mod bus;
pub mod calibration;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod mode;
pub mod oscillator;
pub mod registers;
pub mod report;
pub mod rtcc;
pub mod time;

#[cfg(test)]
mod mock;

pub use calibration::{
    compute_trim, CalibrationEngine, CalibrationPhase, ElapsedTime, SharedCalibration, TrimValue,
};
pub use config::{CalibrationConfig, RtccConfig};
pub use error::{Error, Result, SaturationError};
pub use mode::{ModeKind, OperatingMode};
pub use report::CalibrationReport;
pub use rtcc::Mcp7940m;
pub use time::RtccTime;

pub use hal_abstractions;
