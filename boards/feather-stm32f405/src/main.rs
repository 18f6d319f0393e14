#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod config;
mod tick;
mod twi;

use rtcc_core::SharedCalibration;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// Counters fed by the SysTick handler during a calibration run
static CALIBRATION: SharedCalibration = SharedCalibration::new();

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1])]
mod app {
    use super::*;
    use defmt::{error, info, warn};
    use embassy_stm32::gpio::{Level, Output, Speed};
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::time::Hertz;
    use hal_abstractions::TickSource;
    use rtcc_core::{Mcp7940m, OperatingMode, TrimValue};

    use crate::tick::SysTickTicks;
    use crate::twi::Stm32Twi;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
        rtcc: Mcp7940m<Stm32Twi>,
        ticks: SysTickTicks,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        info!("RTCC firmware starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);
        info!("System initialized, SYSCLK=84MHz");

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        Mono::start(84_000_000);

        let led = Output::new(p.PC1, Level::High, Speed::Low);
        let rtcc = Mcp7940m::new(Stm32Twi::new(), &config::rtcc());
        let ticks = SysTickTicks::new(cx.core.SYST);
        info!("I2C1 ready on PB6/PB7, MCP7940M at {=u8:#x}", config::rtcc().address);

        heartbeat::spawn().ok();

        (Shared {}, Local { led, rtcc, ticks })
    }

    /// Heartbeat task
    #[task(priority = 1, local = [led])]
    async fn heartbeat(cx: heartbeat::Context) {
        loop {
            cx.local.led.set_high();
            Mono::delay(100.millis()).await;
            cx.local.led.set_low();
            Mono::delay(900.millis()).await;
        }
    }

    /// Calibration tick, 1 kHz while a window is open
    #[task(binds = SysTick, priority = 2)]
    fn systick(_cx: systick::Context) {
        CALIBRATION.on_tick();
    }

    /// Sequential RTCC work; the bus is only ever driven from here
    #[idle(local = [rtcc, ticks])]
    fn idle(cx: idle::Context) -> ! {
        let rtcc = cx.local.rtcc;
        let ticks = cx.local.ticks;

        match rtcc.start_oscillator() {
            Ok(true) => info!("RTCC oscillator started"),
            Ok(false) => info!("RTCC oscillator already running"),
            Err(e) => error!("RTCC not responding: {}", e),
        }

        let mode = config::operating_mode();
        info!("Operating mode: {}", mode.kind());

        match mode {
            OperatingMode::Calibrate { config } => {
                if let Err(e) = rtcc.set_trim(TrimValue::NEUTRAL) {
                    warn!("Trim reset failed: {}", e);
                }
                match rtcc.run_calibration(&CALIBRATION, &mut *ticks, config) {
                    Ok(report) => {
                        info!("{}", report.render().as_str());
                        match report.outcome() {
                            Ok(trim) => {
                                info!("Set INITIAL_TRIM to {} for set-time mode", trim)
                            }
                            Err(e) => warn!("{}", e),
                        }
                    }
                    Err(e) => error!("Calibration failed: {}", e),
                }
                loop {
                    cortex_m::asm::wfi();
                }
            }
            OperatingMode::SetTime { time, trim } => {
                match rtcc.set_time(&time).and_then(|()| rtcc.set_trim(trim)) {
                    Ok(()) => info!("RTCC set to {}, trim {}", defmt::Display2Format(&time), trim),
                    Err(e) => error!("Setting the RTCC failed: {}", e),
                }
            }
            OperatingMode::Run => {}
        }

        ticks.arm(1000);
        loop {
            ticks.wait();
            match rtcc.get_time() {
                Ok(time) => info!("{}", defmt::Display2Format(&time)),
                Err(e) => warn!("RTCC read failed: {}", e),
            }
        }
    }
}
