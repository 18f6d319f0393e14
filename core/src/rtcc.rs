//! MCP7940M driver
//!
//! Every field is its own single-byte transaction: `get_time` issues seven
//! reads and `set_time` seven writes. Nothing makes the seven accesses
//! atomic, so a rollover or a power loss between two of them can leave a
//! torn time value behind.

use hal_abstractions::TwiPeripheral;

use crate::bus::Transport;
use crate::calibration::TrimValue;
use crate::channel::RegisterChannel;
use crate::config::RtccConfig;
use crate::error::Result;
use crate::oscillator::OscillatorState;
use crate::registers::{bits, Register, TimeField};
use crate::time::RtccTime;

/// MCP7940M real-time clock/calendar on a two-wire bus
pub struct Mcp7940m<P> {
    channel: RegisterChannel<P>,
    oscillator: OscillatorState,
}

impl<P: TwiPeripheral> Mcp7940m<P> {
    pub fn new(twi: P, config: &RtccConfig) -> Self {
        let transport = Transport::new(twi, config.poll_limit);
        Self {
            channel: RegisterChannel::new(transport, config.address),
            oscillator: OscillatorState::new(),
        }
    }

    /// Give the peripheral back
    pub fn release(self) -> P {
        self.channel.release()
    }

    /// Cached oscillator state
    pub fn oscillator(&self) -> OscillatorState {
        self.oscillator
    }

    /// Read one time field as a decimal value
    pub fn read_field(&mut self, field: TimeField) -> Result<u8> {
        let layout = field.field();
        let raw = self.channel.read_byte(layout.register)?;
        Ok(layout.decode(raw))
    }

    /// Write one time field
    ///
    /// The seconds byte carries the oscillator start bit whenever the
    /// oscillator is known to be started.
    pub fn write_field(&mut self, field: TimeField, value: u8) -> Result<()> {
        let layout = field.field();
        let mut raw = layout.encode(field, value)?;
        if field == TimeField::Seconds {
            raw = self.oscillator.seconds_byte(raw);
        }
        self.channel.write_byte(layout.register, raw)
    }

    /// Read the clock and calendar, one transaction per field
    pub fn get_time(&mut self) -> Result<RtccTime> {
        let mut time = RtccTime::MIN;
        for field in TimeField::ALL {
            time.set(field, self.read_field(field)?);
        }
        Ok(time)
    }

    /// Write the clock and calendar, one transaction per field
    ///
    /// All fields are range checked before the first write goes out.
    pub fn set_time(&mut self, time: &RtccTime) -> Result<()> {
        time.validate()?;
        for field in TimeField::ALL {
            self.write_field(field, time.get(field))?;
        }
        debug!("RTCC time set");
        Ok(())
    }

    /// Start the crystal oscillator unless the chip reports it running
    ///
    /// Starting writes only the ST bit, which zeroes the seconds. The cached
    /// state is marked started once the status read succeeded, whether or
    /// not a start was needed. Returns `true` if a start was issued.
    pub fn start_oscillator(&mut self) -> Result<bool> {
        let status = self.channel.read_byte(Register::Weekday)?;
        let running = status & bits::OSCILLATOR_RUNNING != 0;
        if !running {
            info!("RTCC oscillator stopped, starting it");
            self.channel
                .write_byte(Register::Seconds, bits::START_OSCILLATOR)?;
        }
        self.oscillator.mark_started();
        Ok(!running)
    }

    /// OSCRUN status bit, read without side effects
    pub fn is_oscillator_running(&mut self) -> Result<bool> {
        let status = self.channel.read_byte(Register::Weekday)?;
        Ok(status & bits::OSCILLATOR_RUNNING != 0)
    }

    /// Current digital trim setting
    pub fn trim(&mut self) -> Result<TrimValue> {
        let raw = self.channel.read_byte(Register::Trim)?;
        Ok(TrimValue::from_register(raw))
    }

    /// Program the digital trim register
    pub fn set_trim(&mut self, trim: TrimValue) -> Result<()> {
        debug!("RTCC trim set to {}", trim);
        self.channel.write_byte(Register::Trim, trim.to_register())
    }

    /// Stop the oscillator, zero seconds, minutes and hours and set the
    /// date to the 1st so whole days can be counted across midnight
    pub(crate) fn halt_clock(&mut self) -> Result<()> {
        self.channel.write_byte(Register::Seconds, 0x00)?;
        self.oscillator.mark_stopped();
        self.channel.write_byte(Register::Minutes, 0x00)?;
        self.channel.write_byte(Register::Hours, 0x00)?;
        self.channel.write_byte(Register::Date, 0x01)
    }

    /// Set only the ST bit, restarting the clock from zero seconds
    pub(crate) fn restart_clock(&mut self) -> Result<()> {
        self.channel
            .write_byte(Register::Seconds, bits::START_OSCILLATOR)?;
        self.oscillator.mark_started();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mock::SimulatedRtcc;
    use hal_abstractions::TransactionStatus;

    fn driver(chip: &SimulatedRtcc) -> Mcp7940m<SimulatedRtcc> {
        Mcp7940m::new(chip.clone(), &RtccConfig::default())
    }

    #[test]
    fn test_set_then_get_boundary_values() {
        let chip = SimulatedRtcc::new();
        let mut rtcc = driver(&chip);
        for time in [RtccTime::MIN, RtccTime::MAX] {
            rtcc.set_time(&time).unwrap();
            assert_eq!(rtcc.get_time().unwrap(), time);
        }
    }

    #[test]
    fn test_set_then_get_with_oscillator_started() {
        let chip = SimulatedRtcc::new();
        let mut rtcc = driver(&chip);
        rtcc.start_oscillator().unwrap();
        let time = RtccTime {
            seconds: 0,
            minutes: 26,
            hours: 0,
            weekday: 7,
            date: 30,
            month: 11,
            year: 16,
        };
        rtcc.set_time(&time).unwrap();
        assert_eq!(rtcc.get_time().unwrap(), time);
        assert!(rtcc.is_oscillator_running().unwrap());
    }

    #[test]
    fn test_fields_written_in_register_order() {
        let chip = SimulatedRtcc::new();
        let mut rtcc = driver(&chip);
        rtcc.set_time(&RtccTime::MAX).unwrap();
        let order: Vec<u8> = chip.writes().iter().map(|(reg, _)| *reg).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(chip.transactions(), 7);
    }

    #[test]
    fn test_get_time_reads_each_field_separately() {
        let chip = SimulatedRtcc::new();
        let mut rtcc = driver(&chip);
        rtcc.get_time().unwrap();
        assert_eq!(chip.transactions(), 7);
    }

    #[test]
    fn test_seconds_byte_carries_start_bit_only_when_started() {
        let chip = SimulatedRtcc::new();
        let mut rtcc = driver(&chip);
        rtcc.write_field(TimeField::Seconds, 45).unwrap();
        assert_eq!(chip.register(Register::Seconds), 0x45);

        rtcc.start_oscillator().unwrap();
        for seconds in [0, 9, 45, 59] {
            rtcc.write_field(TimeField::Seconds, seconds).unwrap();
            let raw = chip.register(Register::Seconds);
            assert_ne!(raw & bits::START_OSCILLATOR, 0);
            assert_eq!(TimeField::Seconds.field().decode(raw), seconds);
        }
    }

    #[test]
    fn test_start_oscillator_when_stopped() {
        let chip = SimulatedRtcc::new();
        let mut rtcc = driver(&chip);
        chip.set_register(Register::Seconds, 0x37);
        assert!(!rtcc.oscillator().is_started());

        assert_eq!(rtcc.start_oscillator(), Ok(true));
        assert!(rtcc.oscillator().is_started());
        // only the start bit goes out, the seconds are zeroed
        assert_eq!(chip.writes(), vec![(0x00, bits::START_OSCILLATOR)]);
        assert_eq!(rtcc.read_field(TimeField::Seconds), Ok(0));
    }

    #[test]
    fn test_start_oscillator_when_running() {
        let chip = SimulatedRtcc::new();
        chip.set_register(Register::Seconds, bits::START_OSCILLATOR | 0x12);
        let mut rtcc = driver(&chip);

        assert_eq!(rtcc.start_oscillator(), Ok(false));
        assert!(rtcc.oscillator().is_started());
        assert!(chip.writes().is_empty());
        assert_eq!(rtcc.read_field(TimeField::Seconds), Ok(12));
    }

    #[test]
    fn test_start_oscillator_read_failure_leaves_flag_clear() {
        let chip = SimulatedRtcc::with_address(0x57);
        let mut rtcc = driver(&chip);
        let err = rtcc.start_oscillator().unwrap_err();
        assert_eq!(err.status(), Some(TransactionStatus::AddressWriteNack));
        assert!(!rtcc.oscillator().is_started());
    }

    #[test]
    fn test_invalid_time_writes_nothing() {
        let chip = SimulatedRtcc::new();
        let mut rtcc = driver(&chip);
        let time = RtccTime {
            date: 32,
            ..RtccTime::MIN
        };
        assert_eq!(
            rtcc.set_time(&time),
            Err(Error::OutOfRange {
                field: TimeField::Date,
                value: 32
            })
        );
        assert_eq!(chip.transactions(), 0);
    }

    #[test]
    fn test_flag_bits_do_not_leak_into_fields() {
        let chip = SimulatedRtcc::new();
        chip.set_register(Register::Month, bits::LEAP_YEAR | 0x02);
        chip.set_register(Register::Weekday, bits::OSCILLATOR_RUNNING | 0x04);
        let mut rtcc = driver(&chip);
        let time = rtcc.get_time().unwrap();
        assert_eq!(time.month, 2);
        assert_eq!(time.weekday, 4);
    }

    #[test]
    fn test_trim_register_round_trip() {
        let chip = SimulatedRtcc::new();
        let mut rtcc = driver(&chip);
        let trim = TrimValue::new(54, true);
        rtcc.set_trim(trim).unwrap();
        assert_eq!(chip.register(Register::Trim), 0b1011_0110);
        assert_eq!(rtcc.trim(), Ok(trim));
    }

    #[test]
    fn test_bus_failure_propagates_from_get_time() {
        let chip = SimulatedRtcc::new();
        chip.fail_from_transaction(3);
        let mut rtcc = driver(&chip);
        let err = rtcc.get_time().unwrap_err();
        assert_eq!(err.status(), Some(TransactionStatus::ArbitrationLost));
        // the failing transaction was the last one attempted
        assert_eq!(chip.transactions(), 3);
    }
}
