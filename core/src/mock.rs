//! Test doubles for the bus and the tick interrupt

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use hal_abstractions::{Action, TickSource, TransactionStatus, TwiPeripheral};

use crate::calibration::{CalibrationPhase, SharedCalibration};
use crate::registers::{bits, Register, TimeField, SLAVE_ADDRESS};

/// Replays a fixed list of statuses and records what the driver did
///
/// Every action except STOP consumes the next status; an exhausted script
/// reports `NoInfo`.
pub(crate) struct ScriptedTwi {
    script: VecDeque<TransactionStatus>,
    current: TransactionStatus,
    actions: Vec<Action>,
    loaded: Vec<u8>,
    data: u8,
    stalled: bool,
    delay: u32,
    pending: u32,
    polls: u32,
}

impl ScriptedTwi {
    pub fn new(script: &[TransactionStatus]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            current: TransactionStatus::NoInfo,
            actions: Vec::new(),
            loaded: Vec::new(),
            data: 0,
            stalled: false,
            delay: 0,
            pending: 0,
            polls: 0,
        }
    }

    /// Never raise the completion flag
    pub fn stall(&mut self) {
        self.stalled = true;
    }

    /// Keep the completion flag low for `polls` polls after each action
    pub fn complete_after(&mut self, polls: u32) {
        self.delay = polls;
    }

    /// Byte returned by every receive
    pub fn set_data(&mut self, data: u8) {
        self.data = data;
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn loaded(&self) -> &[u8] {
        &self.loaded
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }
}

impl TwiPeripheral for ScriptedTwi {
    fn begin(&mut self, action: Action) {
        self.actions.push(action);
        self.pending = self.delay;
        if action != Action::Stop {
            self.current = self
                .script
                .pop_front()
                .unwrap_or(TransactionStatus::NoInfo);
        }
    }

    fn is_complete(&mut self) -> bool {
        self.polls += 1;
        if self.stalled {
            return false;
        }
        if self.pending > 0 {
            self.pending -= 1;
            return false;
        }
        true
    }

    fn status(&mut self) -> TransactionStatus {
        self.current
    }

    fn load_data(&mut self, byte: u8) {
        self.loaded.push(byte);
    }

    fn read_data(&mut self) -> u8 {
        self.data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Address,
    Pointer,
    Write,
    Read,
}

struct Chip {
    address: u8,
    registers: [u8; 0x20],
    pointer: u8,
    stage: Stage,
    owned: bool,
    status: TransactionStatus,
    loaded: u8,
    data: u8,
    writes: Vec<(u8, u8)>,
    transactions: usize,
    fail_from: Option<usize>,
}

impl Chip {
    fn begin(&mut self, action: Action) {
        self.status = match action {
            Action::Start => self.start(),
            Action::Stop => {
                self.owned = false;
                self.stage = Stage::Idle;
                return;
            }
            Action::Transmit => self.transmit(),
            Action::ReceiveAck => self.receive(TransactionStatus::DataReceivedAck),
            Action::ReceiveNack => self.receive(TransactionStatus::DataReceivedNack),
        };
    }

    fn start(&mut self) -> TransactionStatus {
        if self.owned {
            self.stage = Stage::Address;
            return TransactionStatus::RepeatedStart;
        }
        self.transactions += 1;
        if self.fail_from.is_some_and(|n| self.transactions >= n) {
            self.stage = Stage::Idle;
            return TransactionStatus::ArbitrationLost;
        }
        self.owned = true;
        self.stage = Stage::Address;
        TransactionStatus::Start
    }

    fn transmit(&mut self) -> TransactionStatus {
        let byte = self.loaded;
        match self.stage {
            Stage::Address => {
                let read = byte & 1 == 1;
                if byte >> 1 != self.address {
                    // nobody answers, the master gives up the bus
                    self.stage = Stage::Idle;
                    self.owned = false;
                    return if read {
                        TransactionStatus::AddressReadNack
                    } else {
                        TransactionStatus::AddressWriteNack
                    };
                }
                if read {
                    self.stage = Stage::Read;
                    TransactionStatus::AddressReadAck
                } else {
                    self.stage = Stage::Pointer;
                    TransactionStatus::AddressWriteAck
                }
            }
            Stage::Pointer => {
                self.pointer = byte & 0x1F;
                self.stage = Stage::Write;
                TransactionStatus::DataSentAck
            }
            Stage::Write => {
                self.store(self.pointer, byte);
                self.pointer = (self.pointer + 1) & 0x1F;
                TransactionStatus::DataSentAck
            }
            Stage::Idle | Stage::Read => TransactionStatus::BusError,
        }
    }

    fn receive(&mut self, ok: TransactionStatus) -> TransactionStatus {
        if self.stage != Stage::Read {
            return TransactionStatus::BusError;
        }
        self.data = self.registers[usize::from(self.pointer)];
        self.pointer = (self.pointer + 1) & 0x1F;
        ok
    }

    fn store(&mut self, register: u8, value: u8) {
        self.writes.push((register, value));
        let index = usize::from(register);
        match register {
            0x00 => {
                self.registers[0] = value;
                self.sync_running();
            }
            // OSCRUN and LP are read-only
            0x03 => {
                let kept = self.registers[3] & bits::OSCILLATOR_RUNNING;
                self.registers[3] = (value & !bits::OSCILLATOR_RUNNING) | kept;
            }
            0x05 => {
                let kept = self.registers[5] & bits::LEAP_YEAR;
                self.registers[5] = (value & !bits::LEAP_YEAR) | kept;
            }
            _ => self.registers[index] = value,
        }
    }

    fn sync_running(&mut self) {
        if self.registers[0] & bits::START_OSCILLATOR != 0 {
            self.registers[3] |= bits::OSCILLATOR_RUNNING;
        } else {
            self.registers[3] &= !bits::OSCILLATOR_RUNNING;
        }
    }

    fn field(&self, field: TimeField) -> u32 {
        let layout = field.field();
        u32::from(layout.decode(self.registers[usize::from(layout.register.address())]))
    }

    fn set_field(&mut self, field: TimeField, value: u32) {
        let layout = field.field();
        let index = usize::from(layout.register.address());
        let flags = self.registers[index] & !(layout.units_mask | layout.tens_mask);
        let value = crate::codec::encode_field(value as u8, layout.units_mask, layout.tens_mask);
        self.registers[index] = flags | value;
    }

    /// Tick the clock, only while the oscillator runs
    ///
    /// Midnight rolls the date over; month ends are not modelled.
    fn advance(&mut self, seconds: u32) {
        if self.registers[0] & bits::START_OSCILLATOR == 0 {
            return;
        }
        let now = self.field(TimeField::Seconds)
            + 60 * self.field(TimeField::Minutes)
            + 3600 * self.field(TimeField::Hours);
        let then = now + seconds;
        let day = then % 86_400;
        self.set_field(TimeField::Seconds, day % 60);
        self.set_field(TimeField::Minutes, day / 60 % 60);
        self.set_field(TimeField::Hours, day / 3600);
        let date = self.field(TimeField::Date) + then / 86_400;
        self.set_field(TimeField::Date, date);
    }
}

/// MCP7940M model answering phase by phase
///
/// Clones share one chip, so a test can keep a handle while the driver owns
/// another. The register pointer auto-increments, writing ST mirrors into
/// OSCRUN and the clock only advances when told to.
#[derive(Clone)]
pub(crate) struct SimulatedRtcc {
    chip: Rc<RefCell<Chip>>,
}

impl SimulatedRtcc {
    pub fn new() -> Self {
        Self::with_address(SLAVE_ADDRESS)
    }

    /// Chip answering on a different address than the driver expects
    pub fn with_address(address: u8) -> Self {
        Self {
            chip: Rc::new(RefCell::new(Chip {
                address,
                registers: [0; 0x20],
                pointer: 0,
                stage: Stage::Idle,
                owned: false,
                status: TransactionStatus::NoInfo,
                loaded: 0,
                data: 0,
                writes: Vec::new(),
                transactions: 0,
                fail_from: None,
            })),
        }
    }

    pub fn register(&self, register: Register) -> u8 {
        self.chip.borrow().registers[usize::from(register.address())]
    }

    /// Preset a register behind the driver's back, without logging a write
    pub fn set_register(&self, register: Register, value: u8) {
        let mut chip = self.chip.borrow_mut();
        chip.registers[usize::from(register.address())] = value;
        if register == Register::Seconds {
            chip.sync_running();
        }
    }

    /// Every register write the bus delivered, in order
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.chip.borrow().writes.clone()
    }

    /// Transactions started, counting the failed ones
    pub fn transactions(&self) -> usize {
        self.chip.borrow().transactions
    }

    /// Lose arbitration on the `n`th transaction (1-based) and every later one
    pub fn fail_from_transaction(&self, n: usize) {
        self.chip.borrow_mut().fail_from = Some(n);
    }

    pub fn advance_seconds(&self, seconds: u32) {
        self.chip.borrow_mut().advance(seconds);
    }
}

impl TwiPeripheral for SimulatedRtcc {
    fn begin(&mut self, action: Action) {
        self.chip.borrow_mut().begin(action);
    }

    fn is_complete(&mut self) -> bool {
        true
    }

    fn status(&mut self) -> TransactionStatus {
        self.chip.borrow().status
    }

    fn load_data(&mut self, byte: u8) {
        self.chip.borrow_mut().loaded = byte;
    }

    fn read_data(&mut self) -> u8 {
        self.chip.borrow().data
    }
}

/// Tick source firing one second worth of ticks per `wait`
///
/// Each second counted locally also advances the simulated chip by one
/// second, unless the chip is set to lose or gain one.
pub(crate) struct SimulatedTicks<'a> {
    shared: &'a SharedCalibration,
    chip: SimulatedRtcc,
    armed: bool,
    lose_every: Option<u32>,
    gain_every: Option<u32>,
    counted: u32,
}

impl<'a> SimulatedTicks<'a> {
    pub fn new(shared: &'a SharedCalibration, chip: SimulatedRtcc) -> Self {
        Self {
            shared,
            chip,
            armed: false,
            lose_every: None,
            gain_every: None,
            counted: 0,
        }
    }

    /// Chip misses every `n`th second
    pub fn losing_every(mut self, n: u32) -> Self {
        self.lose_every = Some(n);
        self
    }

    /// Chip counts two seconds on every `n`th second
    pub fn gaining_every(mut self, n: u32) -> Self {
        self.gain_every = Some(n);
        self
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl TickSource for SimulatedTicks<'_> {
    fn arm(&mut self, period_ms: u32) {
        assert_eq!(period_ms, 1);
        self.armed = true;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn wait(&mut self) {
        assert!(self.armed, "waiting on a disarmed tick source");
        let counting = self.shared.phase() == CalibrationPhase::Accumulating;
        for _ in 0..1000 {
            self.shared.on_tick();
        }
        if counting {
            self.counted += 1;
            let hit = |every: Option<u32>| every.is_some_and(|n| self.counted % n == 0);
            if hit(self.gain_every) {
                self.chip.advance_seconds(2);
            } else if !hit(self.lose_every) {
                self.chip.advance_seconds(1);
            }
        }
    }
}
