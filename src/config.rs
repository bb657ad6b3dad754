//! All configuration related structures and tables

use crate::can_error::CanError;

/// Peripheral clock the timing table is computed for.
pub const CAN_CLOCK_HZ: u32 = 50_000_000;

/// Nominal (arbitration phase) bit timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    pub prescalar_division: u16,
    pub phase_seg_1: u8,
    pub phase_seg_2: u8,
    pub jump_width: u8,
    pub bitrate_kbps: u16,
}

impl TimingConfig {
    /// Time quanta per bit, including the sync segment.
    pub fn time_quanta(&self) -> u32 {
        1 + self.phase_seg_1 as u32 + self.phase_seg_2 as u32
    }

    pub fn bitrate_bps(&self) -> u32 {
        self.bitrate_kbps as u32 * 1000
    }

    /// Looks up the fixed timing for one of the standard CANopen bitrates.
    pub fn for_bitrate(bitrate_kbps: u16) -> Result<&'static TimingConfig, CanError> {
        BIT_TIMINGS
            .iter()
            .find(|timing| timing.bitrate_kbps == bitrate_kbps)
            .ok_or(CanError::IllegalBaudrate)
    }
}

const fn timing(prescalar_division: u16, bitrate_kbps: u16) -> TimingConfig {
    TimingConfig {
        prescalar_division,
        phase_seg_1: 7,
        phase_seg_2: 2,
        jump_width: 2,
        bitrate_kbps,
    }
}

// 800 kbps is not reachable from a 50 MHz clock with 10 quanta per bit
pub const BIT_TIMINGS: [TimingConfig; 7] = [
    timing(500, 10),
    timing(250, 20),
    timing(100, 50),
    timing(40, 125),
    timing(20, 250),
    timing(10, 500),
    timing(5, 1000),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Nominal bitrate in kbit/s, one of the rates in [`BIT_TIMINGS`].
    pub bitrate_kbps: u16,
    /// Let the peripheral select the filter channel instead of scanning the table in software.
    pub hw_filters: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bitrate_kbps: 125,
            hw_filters: false,
        }
    }
}
