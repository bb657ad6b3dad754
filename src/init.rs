//! Does all initialization and configuration oriented things

use crate::can_error::CanError;
use crate::config::{Config, TimingConfig};
use crate::filter::{FilterEntry, FrameConsumer};
use crate::monitor::BusErrorMonitor;
use crate::peripheral::{AcceptFilter, Interrupts, Peripheral, PeripheralMode};
use crate::{CanModule, State};

impl<'a, P: Peripheral, const RX: usize, const TX: usize> CanModule<'a, P, RX, TX> {
    /// Resets all slots and filters, powers the peripheral and applies the
    /// bit timing for `config.bitrate_kbps`.
    ///
    /// Leaves the module in [`State::Configuration`]. On an unsupported
    /// bitrate nothing is touched.
    pub fn init(&mut self, config: Config) -> Result<(), CanError> {
        if RX == 0 || TX == 0 {
            return Err(CanError::IllegalArgument);
        }

        let timing = TimingConfig::for_bitrate(config.bitrate_kbps)?;

        self.config = config;
        self.filters.clear();
        self.powered = false;

        let shared = self.shared.get_mut().get_mut();
        shared.tx = Default::default();
        shared.monitor = BusErrorMonitor::new();

        let peripheral = &mut shared.peripheral;

        if let Err(err) = peripheral.set_power(true) {
            log::error!("CAN power up failed: {:?}", err);
            return Err(CanError::InvalidState);
        }

        if let Err(err) = peripheral.init() {
            log::error!("CAN peripheral init failed: {:?}", err);
            return Err(CanError::InvalidState);
        }

        if let Err(err) = peripheral.set_bit_timing(timing) {
            log::error!("CAN bit timing for {} kbps failed: {:?}", timing.bitrate_kbps, err);
            return Err(CanError::IllegalBaudrate);
        }

        self.state = State::Configuration;
        self.powered = true;

        if cfg!(feature = "debuginfo") {
            log::info!(
                "CAN module initialized at {} kbps (prescalar {}, {} tq), {} rx filters, {} tx slots",
                timing.bitrate_kbps,
                timing.prescalar_division,
                timing.time_quanta(),
                RX,
                TX
            );
        }

        Ok(())
    }

    /// Registers the consumer for receive channel `index`.
    ///
    /// `ident` and `mask` are 11-bit values, a 1 in `mask` is a bit that has to match.
    pub fn register_filter(
        &mut self,
        index: usize,
        ident: u16,
        mask: u16,
        rtr: bool,
        consumer: &'a dyn FrameConsumer,
    ) -> Result<(), CanError> {
        if self.state != State::Configuration {
            return Err(CanError::InvalidState);
        }

        let entry = FilterEntry::new(ident, mask, rtr, consumer);
        self.filters.set(index, entry)?;

        if self.config.hw_filters {
            let filter = AcceptFilter {
                channel: index,
                ident: entry.ident,
                mask: entry.mask,
            };
            if let Err(err) = self.shared.get_mut().get_mut().peripheral.set_accept_filter(&filter) {
                log::error!("CAN accept filter {} failed: {:?}", index, err);
                return Err(CanError::InvalidState);
            }
        }

        Ok(())
    }

    /// Stages identifier, length and sync flag of transmit slot `index`.
    pub fn prepare_tx(
        &mut self,
        index: usize,
        ident: u16,
        rtr: bool,
        dlc: u8,
        sync: bool,
    ) -> Result<(), CanError> {
        self.shared.get_mut().get_mut().tx.prepare(index, ident, rtr, dlc, sync)
    }

    /// Starts the bus: accept filter, interrupts, normal mode and the first
    /// receive request.
    ///
    /// Fails with [`CanError::InvalidState`] outside configuration and after
    /// [`CanModule::disable`] until [`CanModule::init`] ran again.
    pub fn set_normal_mode(&mut self) -> Result<(), CanError> {
        if self.state != State::Configuration || !self.powered {
            return Err(CanError::InvalidState);
        }

        let accept_all = !self.config.hw_filters || self.filters.is_empty();
        let peripheral = &mut self.shared.get_mut().get_mut().peripheral;

        if accept_all {
            if let Err(err) = peripheral.set_accept_filter(&AcceptFilter::accept_all()) {
                log::error!("CAN accept-all filter failed: {:?}", err);
                return Err(CanError::InvalidState);
            }
        }

        let interrupts = Interrupts::TX
            | Interrupts::RX
            | Interrupts::DATA_OVERRUN
            | Interrupts::BUS_ERROR
            | Interrupts::ERROR_PASSIVE
            | Interrupts::ERROR_WARNING
            | Interrupts::ARBITRATION_LOST;
        if let Err(err) = peripheral.enable_interrupts(interrupts) {
            log::error!("CAN interrupt enable failed: {:?}", err);
            return Err(CanError::InvalidState);
        }

        if let Err(err) = peripheral.set_mode(PeripheralMode::Normal) {
            log::error!("CAN normal mode failed: {:?}", err);
            return Err(CanError::InvalidState);
        }

        if let Err(err) = peripheral.read_async() {
            log::error!("CAN receive request failed: {:?}", err);
            return Err(CanError::InvalidState);
        }

        self.state = State::Normal;
        Ok(())
    }

    /// Stops taking part in bus traffic so filters and slots can be reconfigured.
    pub fn set_configuration_mode(&mut self) {
        if let Err(err) = self
            .shared
            .get_mut()
            .get_mut()
            .peripheral
            .set_mode(PeripheralMode::Initialization)
        {
            log::error!("CAN configuration mode failed: {:?}", err);
        }

        if self.state == State::Normal {
            self.state = State::Configuration;
        }
    }

    /// Powers the peripheral down, for example before switching bitrate.
    /// [`CanModule::init`] has to run again before going back to normal mode.
    pub fn disable(&mut self) {
        let peripheral = &mut self.shared.get_mut().get_mut().peripheral;

        if let Err(err) = peripheral.set_power(false) {
            log::error!("CAN power down failed: {:?}", err);
        }
        if let Err(err) = peripheral.uninit() {
            log::error!("CAN peripheral uninit failed: {:?}", err);
        }
        self.powered = false;

        if self.state == State::Normal {
            self.state = State::Configuration;
        }
    }
}
