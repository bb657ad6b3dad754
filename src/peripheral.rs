//! The CAN peripheral as seen by the driver core
//!
//! Register access, clocks and pin muxing live behind [`Peripheral`]. The
//! driver only needs a single transmit mailbox, one pending asynchronous
//! receive request and read access to the error counters.

use core::fmt::Debug;

use crate::config::TimingConfig;
use crate::frame::CanFrame;

bitflags::bitflags! {
    /// Interrupt sources of the CAN peripheral.
    #[derive(Default)]
    pub struct Interrupts: u32 {
        const TX = 1 << 0;
        const RX = 1 << 1;
        const DATA_OVERRUN = 1 << 2;
        const BUS_ERROR = 1 << 3;
        const ERROR_PASSIVE = 1 << 4;
        const ERROR_WARNING = 1 << 5;
        const ARBITRATION_LOST = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralMode {
    Initialization,
    Normal,
}

/// Raw error counter snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorCounters {
    pub tx: u16,
    pub rx: u16,
    /// Receive data overrun flag.
    pub overflow: bool,
}

/// Hardware accept filter for one logical receive channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptFilter {
    pub channel: usize,
    pub ident: u16,
    pub mask: u16,
}

impl AcceptFilter {
    /// Every frame with a standard identifier passes.
    pub const fn accept_all() -> Self {
        Self {
            channel: 0,
            ident: 0,
            mask: 0,
        }
    }
}

/// A frame taken from the receive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    pub frame: CanFrame,
    /// Channel selected by the hardware filters, if they are in use.
    pub filter_hit: Option<usize>,
}

pub trait Peripheral {
    type Error: Debug;

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Attaches the driver to the peripheral instance.
    fn init(&mut self) -> Result<(), Self::Error>;

    fn uninit(&mut self) -> Result<(), Self::Error>;

    fn set_mode(&mut self, mode: PeripheralMode) -> Result<(), Self::Error>;

    fn set_bit_timing(&mut self, timing: &TimingConfig) -> Result<(), Self::Error>;

    fn set_accept_filter(&mut self, filter: &AcceptFilter) -> Result<(), Self::Error>;

    /// Whether the single transmit mailbox can take a frame right now.
    fn tx_ready(&self) -> bool;

    /// Starts transmission of one frame. Completion is signalled with a
    /// transmit-complete object event.
    fn send_async(&mut self, frame: &CanFrame) -> Result<(), Self::Error>;

    /// Arms one asynchronous receive request.
    fn read_async(&mut self) -> Result<(), Self::Error>;

    /// The frame delivered for the last armed receive request.
    fn take_received(&mut self) -> Option<Received>;

    fn enable_interrupts(&mut self, interrupts: Interrupts) -> Result<(), Self::Error>;

    fn disable_interrupts(&mut self, interrupts: Interrupts) -> Result<(), Self::Error>;

    fn error_counters(&self) -> ErrorCounters;
}
