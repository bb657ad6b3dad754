//! CAN module driver core for a CANopen stack
//!
//! [`CanModule`] sits between a CAN peripheral with a single transmit mailbox
//! and the CANopen protocol objects. It queues outgoing frames while the
//! mailbox is busy, routes received frames through a filter table and keeps a
//! sticky [`ErrorStatus`] derived from the bus error counters.
//!
//! Configuration calls take `&mut self`. Once [`CanModule::set_normal_mode`]
//! succeeded the module is shared between the foreground loop and the CAN
//! interrupt, every runtime call takes `&self` and guards the shared state
//! with a critical section.

#![cfg_attr(not(test), no_std)]

pub mod can_error;
pub mod config;
pub mod filter;
pub mod frame;
pub mod interrupt;
pub mod mailbox;
pub mod monitor;
pub mod peripheral;
mod init;
mod receive;
mod transfer;

use core::cell::RefCell;

use critical_section::Mutex;

pub use can_error::CanError;
pub use config::{Config, TimingConfig};
pub use filter::{FilterEntry, FilterTable, FrameConsumer};
pub use frame::CanFrame;
pub use interrupt::{ObjectEvent, Registry, UnitEvent};
pub use mailbox::TxPool;
pub use monitor::{BusErrorMonitor, ErrorStatus};
pub use peripheral::{AcceptFilter, ErrorCounters, Interrupts, Peripheral, PeripheralMode, Received};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Configuration,
    Normal,
}

/// State touched from both the foreground and the interrupt.
struct Shared<P, const TX: usize> {
    peripheral: P,
    tx: TxPool<TX>,
    monitor: BusErrorMonitor,
}

pub struct CanModule<'a, P, const RX: usize, const TX: usize> {
    shared: Mutex<RefCell<Shared<P, TX>>>,
    filters: FilterTable<'a, RX>,
    config: Config,
    state: State,
    /// Peripheral powered and initialized, cleared by `disable`.
    powered: bool,
}

impl<'a, P: Peripheral, const RX: usize, const TX: usize> CanModule<'a, P, RX, TX> {
    pub fn new(peripheral: P) -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                peripheral,
                tx: TxPool::new(),
                monitor: BusErrorMonitor::new(),
            })),
            filters: FilterTable::new(),
            config: Config::default(),
            state: State::Uninitialized,
            powered: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_normal(&self) -> bool {
        self.state == State::Normal
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Samples the bus error counters. Call periodically from the foreground.
    ///
    /// Returns whether the counters changed since the last call.
    pub fn process(&self) -> bool {
        critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let counters = shared.peripheral.error_counters();
            shared.monitor.sample(counters)
        })
    }

    pub fn error_status(&self) -> ErrorStatus {
        critical_section::with(|cs| self.shared.borrow_ref(cs).monitor.status())
    }

    /// Number of slots waiting for the mailbox.
    pub fn pending_count(&self) -> usize {
        critical_section::with(|cs| self.shared.borrow_ref(cs).tx.pending_count())
    }

    /// Whether a frame occupies the hardware mailbox.
    pub fn in_flight(&self) -> bool {
        critical_section::with(|cs| self.shared.borrow_ref(cs).tx.in_flight())
    }

    /// Queued frames lost because the mailbox rejected them.
    pub fn dropped_count(&self) -> usize {
        critical_section::with(|cs| self.shared.borrow_ref(cs).tx.dropped())
    }

    /// Runs `f` with exclusive access to the peripheral.
    pub fn peripheral<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        critical_section::with(|cs| f(&mut self.shared.borrow_ref_mut(cs).peripheral))
    }

    /// Releases the peripheral, for a module that is not shared anymore.
    pub fn free(self) -> P {
        self.shared.into_inner().into_inner().peripheral
    }
}
