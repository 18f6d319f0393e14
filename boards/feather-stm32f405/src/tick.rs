//! SysTick as the calibration tick source
//!
//! SysTick runs from HCLK/8 so that periods up to one second fit the 24-bit
//! reload register. The exception itself is bound to an RTIC hardware task
//! in `main.rs`; this type only programs the timer and parks the idle
//! context.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use hal_abstractions::TickSource;

/// SysTick input clock with the HCLK/8 source
const SYSTICK_HZ: u32 = crate::config::HCLK_HZ / 8;
const MAX_RELOAD: u32 = 0x00FF_FFFF;

pub struct SysTickTicks {
    syst: SYST,
}

impl SysTickTicks {
    pub fn new(mut syst: SYST) -> Self {
        syst.disable_interrupt();
        syst.disable_counter();
        syst.set_clock_source(SystClkSource::External);
        Self { syst }
    }
}

impl TickSource for SysTickTicks {
    fn arm(&mut self, period_ms: u32) {
        let reload = (SYSTICK_HZ / 1000 * period_ms).clamp(1, MAX_RELOAD + 1) - 1;
        self.syst.set_reload(reload);
        self.syst.clear_current();
        // drop a stale COUNTFLAG
        let _ = self.syst.has_wrapped();
        self.syst.enable_interrupt();
        self.syst.enable_counter();
    }

    fn disarm(&mut self) {
        self.syst.disable_interrupt();
        self.syst.disable_counter();
    }

    /// Sleep until the counter wrapped at least once since the last call
    fn wait(&mut self) {
        while !self.syst.has_wrapped() {
            cortex_m::asm::wfi();
        }
    }
}
