//! I2C1 master at register level (STM32F4 I2C v1)
//!
//! The v1 block reports events rather than status codes. Each action waits
//! for the event flag that ends it and translates what it saw into the
//! matching [`TransactionStatus`]:
//!
//! | action            | done on      | status                           |
//! |-------------------|--------------|----------------------------------|
//! | START             | SB           | start / repeated start           |
//! | transmit address  | ADDR or AF   | SLA+W/SLA+R ack or nack          |
//! | transmit data     | BTF or AF    | data sent ack or nack            |
//! | receive           | RXNE         | data received ack or nack        |
//!
//! BERR and ARLO end any action early. A NACK also queues a STOP so the
//! bus is free for the next transaction even though the driver aborts
//! without one.
//!
//! Pins: SCL on PB6, SDA on PB7 (AF4, open drain, external pull-ups on the
//! Feather). Bus clock 100 kHz from a 42 MHz APB1.

use hal_abstractions::{Action, TransactionStatus, TwiPeripheral};
use stm32_metapac::gpio::vals::{Moder, Ot, Pupdr};
use stm32_metapac::{GPIOB, I2C1, RCC};

const APB1_MHZ: u8 = 42;
const BUS_HZ: u32 = 100_000;
const SCL_PIN: usize = 6;
const SDA_PIN: usize = 7;
const AF_I2C1: u8 = 4;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pending {
    Idle,
    Start,
    Address { read: bool },
    Data,
    Receive { ack: bool },
}

pub struct Stm32Twi {
    pending: Pending,
    status: TransactionStatus,
    data: u8,
    owned: bool,
    address_next: bool,
    stop_requested: bool,
}

impl Stm32Twi {
    /// Clock, reset and configure I2C1 and its pins
    pub fn new() -> Self {
        RCC.ahb1enr().modify(|w| w.set_gpioben(true));
        RCC.apb1enr().modify(|w| w.set_i2c1en(true));
        RCC.apb1rstr().modify(|w| w.set_i2c1rst(true));
        RCC.apb1rstr().modify(|w| w.set_i2c1rst(false));

        for pin in [SCL_PIN, SDA_PIN] {
            GPIOB.otyper().modify(|w| w.set_ot(pin, Ot::OPENDRAIN));
            GPIOB.pupdr().modify(|w| w.set_pupdr(pin, Pupdr::PULLUP));
            GPIOB.afr(0).modify(|w| w.set_afr(pin, AF_I2C1));
            GPIOB.moder().modify(|w| w.set_moder(pin, Moder::ALTERNATE));
        }

        I2C1.cr1().modify(|w| w.set_pe(false));
        I2C1.cr2().modify(|w| w.set_freq(APB1_MHZ));
        // standard mode: T_high = T_low = CCR * T_pclk1
        I2C1.ccr()
            .modify(|w| w.set_ccr((u32::from(APB1_MHZ) * 1_000_000 / (2 * BUS_HZ)) as u16));
        // 1000 ns max rise time
        I2C1.trise().write(|w| w.set_trise(APB1_MHZ + 1));
        I2C1.cr1().modify(|w| w.set_pe(true));

        Self {
            pending: Pending::Idle,
            status: TransactionStatus::NoInfo,
            data: 0,
            owned: false,
            address_next: false,
            stop_requested: false,
        }
    }

    /// A NACKed master has to release the bus itself
    fn release_after_nack(&mut self) {
        I2C1.sr1().modify(|w| w.set_af(false));
        I2C1.cr1().modify(|w| w.set_stop(true));
        self.owned = false;
        self.stop_requested = true;
    }

    fn finish(&mut self, status: TransactionStatus) -> bool {
        self.status = status;
        self.pending = Pending::Idle;
        true
    }
}

impl TwiPeripheral for Stm32Twi {
    fn begin(&mut self, action: Action) {
        match action {
            Action::Start => {
                self.pending = Pending::Start;
                self.stop_requested = false;
                I2C1.cr1().modify(|w| w.set_start(true));
            }
            Action::Stop => {
                if !self.stop_requested {
                    I2C1.cr1().modify(|w| w.set_stop(true));
                }
                self.stop_requested = false;
                self.owned = false;
                self.pending = Pending::Idle;
            }
            Action::Transmit => {
                // the first byte after a START is the address
                self.pending = if core::mem::take(&mut self.address_next) {
                    Pending::Address {
                        read: self.data & 1 == 1,
                    }
                } else {
                    Pending::Data
                };
                I2C1.dr().write(|w| w.set_dr(self.data));
            }
            Action::ReceiveAck => {
                I2C1.cr1().modify(|w| w.set_ack(true));
                self.pending = Pending::Receive { ack: true };
            }
            Action::ReceiveNack => {
                // last byte: NACK it and queue the STOP behind it
                I2C1.cr1().modify(|w| {
                    w.set_ack(false);
                    w.set_stop(true);
                });
                self.stop_requested = true;
                self.pending = Pending::Receive { ack: false };
            }
        }
    }

    fn is_complete(&mut self) -> bool {
        let sr1 = I2C1.sr1().read();
        if sr1.berr() {
            I2C1.sr1().modify(|w| w.set_berr(false));
            self.owned = false;
            return self.finish(TransactionStatus::BusError);
        }
        if sr1.arlo() {
            I2C1.sr1().modify(|w| w.set_arlo(false));
            self.owned = false;
            return self.finish(TransactionStatus::ArbitrationLost);
        }

        match self.pending {
            Pending::Idle => true,
            Pending::Start => {
                if !sr1.start() {
                    return false;
                }
                let status = if self.owned {
                    TransactionStatus::RepeatedStart
                } else {
                    TransactionStatus::Start
                };
                self.owned = true;
                self.address_next = true;
                self.finish(status)
            }
            Pending::Address { read } => {
                if sr1.addr() {
                    if read {
                        // ACK must be cleared before ADDR for a one-byte read
                        I2C1.cr1().modify(|w| w.set_ack(false));
                    }
                    // reading SR2 after SR1 clears ADDR
                    let _ = I2C1.sr2().read();
                    self.finish(if read {
                        TransactionStatus::AddressReadAck
                    } else {
                        TransactionStatus::AddressWriteAck
                    })
                } else if sr1.af() {
                    self.release_after_nack();
                    self.finish(if read {
                        TransactionStatus::AddressReadNack
                    } else {
                        TransactionStatus::AddressWriteNack
                    })
                } else {
                    false
                }
            }
            Pending::Data => {
                if sr1.btf() {
                    self.finish(TransactionStatus::DataSentAck)
                } else if sr1.af() {
                    self.release_after_nack();
                    self.finish(TransactionStatus::DataSentNack)
                } else {
                    false
                }
            }
            Pending::Receive { ack } => {
                if !sr1.rxne() {
                    return false;
                }
                self.data = I2C1.dr().read().dr();
                self.finish(if ack {
                    TransactionStatus::DataReceivedAck
                } else {
                    TransactionStatus::DataReceivedNack
                })
            }
        }
    }

    fn status(&mut self) -> TransactionStatus {
        self.status
    }

    fn load_data(&mut self, byte: u8) {
        self.data = byte;
    }

    fn read_data(&mut self) -> u8 {
        self.data
    }
}
