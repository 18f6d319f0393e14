//! Board configuration
//!
//! The operating mode comes from the `RTCC_MODE` environment variable at
//! build time (`calibrate`, `set-time` or `run`) and falls back to
//! [`DEFAULT_MODE`]:
//!
//! ```text
//! RTCC_MODE=calibrate cargo run --release
//! ```

use defmt::warn;
use rtcc_core::{CalibrationConfig, ModeKind, OperatingMode, RtccConfig, RtccTime, TrimValue};

/// SYSCLK = HCLK after the PLL set-up in `init`
pub const HCLK_HZ: u32 = 84_000_000;

pub const DEFAULT_MODE: ModeKind = ModeKind::Run;

/// Measurement window; a full day gives the best resolution
pub const CALIBRATION_WINDOW_MINUTES: u32 = 24 * 60;

/// Time written in set-time mode
pub const INITIAL_TIME: RtccTime = RtccTime {
    seconds: 0,
    minutes: 26,
    hours: 0,
    weekday: 7,
    date: 30,
    month: 11,
    year: 16,
};

/// Trim written in set-time mode, from an earlier calibration run.
/// The crystal measured 32766.2 Hz at room temperature, 108 cycles per
/// minute slow.
pub const INITIAL_TRIM: TrimValue = TrimValue::new(54, true);

pub fn rtcc() -> RtccConfig {
    RtccConfig::default()
}

/// Mode selected at build time
pub fn operating_mode() -> OperatingMode {
    let kind = match option_env!("RTCC_MODE") {
        Some(name) => name.parse().unwrap_or_else(|e| {
            warn!("RTCC_MODE: {}, using {}", defmt::Display2Format(&e), DEFAULT_MODE);
            DEFAULT_MODE
        }),
        None => DEFAULT_MODE,
    };
    OperatingMode::from_kind(
        kind,
        CalibrationConfig::with_window(CALIBRATION_WINDOW_MINUTES),
        INITIAL_TIME,
        INITIAL_TRIM,
    )
}
