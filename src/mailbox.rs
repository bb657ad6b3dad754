//! Software transmit slots waiting for the hardware mailbox

use crate::can_error::CanError;
use crate::frame::{encode_ident, CanFrame, CAN_MAX_DLC};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxSlot {
    pub frame: CanFrame,
    /// Waiting for the mailbox.
    pub pending: bool,
    /// Synchronous TPDO, may be withdrawn before the next SYNC.
    pub sync: bool,
}

/// Fixed pool of transmit slots plus the state of the one hardware mailbox.
///
/// The frame in the mailbox is not part of the pool, only the slots still
/// waiting for it are counted in [`TxPool::pending_count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxPool<const N: usize> {
    slots: [TxSlot; N],
    pending_count: usize,
    /// A frame was handed to the mailbox and its completion is outstanding.
    in_flight: bool,
    /// The frame in the mailbox is a synchronous one.
    sync_in_flight: bool,
    /// Bootup message not sent yet.
    first_tx: bool,
    /// Queued frames the mailbox refused, lost for good.
    dropped: usize,
}

impl<const N: usize> Default for TxPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TxPool<N> {
    pub fn new() -> Self {
        Self {
            slots: [TxSlot::default(); N],
            pending_count: 0,
            in_flight: false,
            sync_in_flight: false,
            first_tx: true,
            dropped: 0,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending_count
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn sync_in_flight(&self) -> bool {
        self.sync_in_flight
    }

    pub fn first_tx(&self) -> bool {
        self.first_tx
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn slot(&self, index: usize) -> Option<&TxSlot> {
        self.slots.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Result<&mut TxSlot, CanError> {
        self.slots.get_mut(index).ok_or(CanError::IllegalArgument)
    }

    /// Stages identifier, length and sync flag of a slot.
    pub fn prepare(
        &mut self,
        index: usize,
        ident: u16,
        rtr: bool,
        dlc: u8,
        sync: bool,
    ) -> Result<(), CanError> {
        if dlc > CAN_MAX_DLC {
            return Err(CanError::IllegalArgument);
        }

        let slot = self.slot_mut(index)?;
        slot.frame.set_header(encode_ident(ident, rtr), dlc);
        slot.pending = false;
        slot.sync = sync;

        Ok(())
    }

    /// Marks a slot as waiting. Returns `false` if it already was, the
    /// counter is only bumped once per slot.
    pub fn enqueue(&mut self, index: usize) -> Result<bool, CanError> {
        let slot = self.slot_mut(index)?;
        if slot.pending {
            return Ok(false);
        }
        slot.pending = true;
        self.pending_count += 1;
        Ok(true)
    }

    /// Takes the lowest-index waiting slot out of the queue.
    pub fn dequeue(&mut self) -> Option<(CanFrame, bool)> {
        if self.pending_count == 0 {
            return None;
        }

        match self.slots.iter_mut().find(|slot| slot.pending) {
            Some(slot) => {
                slot.pending = false;
                self.pending_count -= 1;
                Some((slot.frame, slot.sync))
            }
            None => {
                // counter drifted from the flags, nothing is actually queued
                self.pending_count = 0;
                None
            }
        }
    }

    /// Records that a frame now occupies the hardware mailbox.
    pub fn mark_in_flight(&mut self, sync: bool) {
        self.in_flight = true;
        self.sync_in_flight = sync;
    }

    /// Transmit-complete bookkeeping, the mailbox is free again.
    pub fn complete(&mut self) {
        self.first_tx = false;
        self.release();
    }

    /// Forgets the frame in the mailbox without a completion, for when the
    /// hardware gave up on it.
    pub fn release(&mut self) {
        self.in_flight = false;
        self.sync_in_flight = false;
    }

    /// Counts a dequeued frame that never made it into the mailbox.
    pub fn record_dropped(&mut self) {
        self.dropped = self.dropped.saturating_add(1);
    }

    /// Withdraws queued synchronous slots and the sync mark of the frame in
    /// the mailbox.
    ///
    /// Returns whether anything was withdrawn.
    pub fn drop_pending_sync(&mut self) -> bool {
        let mut dropped = false;

        if self.sync_in_flight {
            self.sync_in_flight = false;
            dropped = true;
        }

        if self.pending_count != 0 {
            for slot in self.slots.iter_mut().filter(|slot| slot.pending && slot.sync) {
                slot.pending = false;
                self.pending_count -= 1;
                dropped = true;
            }
        }

        dropped
    }
}
