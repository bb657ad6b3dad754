#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use canopen_canmodule::{
    AcceptFilter, CanFrame, ErrorCounters, FrameConsumer, Interrupts, Peripheral, PeripheralMode,
    Received, TimingConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeError;

/// Records every call the driver makes. The mailbox holds the last sent
/// frame until `finish_tx`, `tx_busy` keeps it occupied from outside.
#[derive(Debug, Default)]
pub struct FakePeripheral {
    pub powered: bool,
    pub initialized: bool,
    pub mode: Option<PeripheralMode>,
    pub timing: Option<TimingConfig>,
    pub filters: Vec<AcceptFilter>,
    pub interrupts: Interrupts,
    pub sent: Vec<CanFrame>,
    pub rx_queue: VecDeque<Received>,
    pub rx_requests: usize,
    pub counters: ErrorCounters,
    pub mailbox_full: bool,
    pub tx_busy: bool,
    pub reject_send: bool,
    /// Number of upcoming sends to refuse.
    pub reject_next: usize,
    pub fail_power: bool,
}

impl FakePeripheral {
    pub fn sent_ids(&self) -> Vec<u16> {
        self.sent.iter().map(|frame| frame.std_id()).collect()
    }

    /// The frame in the mailbox left the controller.
    pub fn finish_tx(&mut self) {
        self.mailbox_full = false;
    }

    pub fn push_rx(&mut self, ident: u16, data: &[u8], filter_hit: Option<usize>) {
        let frame = CanFrame::from_raw(ident, data.len() as u8, data).unwrap();
        self.rx_queue.push_back(Received { frame, filter_hit });
    }
}

impl Peripheral for FakePeripheral {
    type Error = FakeError;

    fn set_power(&mut self, on: bool) -> Result<(), FakeError> {
        if self.fail_power {
            return Err(FakeError);
        }
        self.powered = on;
        Ok(())
    }

    fn init(&mut self) -> Result<(), FakeError> {
        self.initialized = true;
        Ok(())
    }

    fn uninit(&mut self) -> Result<(), FakeError> {
        self.initialized = false;
        Ok(())
    }

    fn set_mode(&mut self, mode: PeripheralMode) -> Result<(), FakeError> {
        self.mode = Some(mode);
        Ok(())
    }

    fn set_bit_timing(&mut self, timing: &TimingConfig) -> Result<(), FakeError> {
        self.timing = Some(*timing);
        Ok(())
    }

    fn set_accept_filter(&mut self, filter: &AcceptFilter) -> Result<(), FakeError> {
        self.filters.push(*filter);
        Ok(())
    }

    fn tx_ready(&self) -> bool {
        !self.tx_busy && !self.mailbox_full
    }

    fn send_async(&mut self, frame: &CanFrame) -> Result<(), FakeError> {
        if !self.tx_ready() || self.reject_send {
            return Err(FakeError);
        }
        if self.reject_next > 0 {
            self.reject_next -= 1;
            return Err(FakeError);
        }
        self.sent.push(*frame);
        self.mailbox_full = true;
        Ok(())
    }

    fn read_async(&mut self) -> Result<(), FakeError> {
        self.rx_requests += 1;
        Ok(())
    }

    fn take_received(&mut self) -> Option<Received> {
        self.rx_queue.pop_front()
    }

    fn enable_interrupts(&mut self, interrupts: Interrupts) -> Result<(), FakeError> {
        self.interrupts.insert(interrupts);
        Ok(())
    }

    fn disable_interrupts(&mut self, interrupts: Interrupts) -> Result<(), FakeError> {
        self.interrupts.remove(interrupts);
        Ok(())
    }

    fn error_counters(&self) -> ErrorCounters {
        self.counters
    }
}

/// Protocol object stand-in that keeps what it received.
#[derive(Debug, Default)]
pub struct Recorder {
    frames: Mutex<Vec<CanFrame>>,
}

impl Recorder {
    pub fn frames(&self) -> Vec<CanFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl FrameConsumer for Recorder {
    fn receive(&self, frame: &CanFrame) {
        self.frames.lock().unwrap().push(*frame);
    }
}
