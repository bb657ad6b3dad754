use crate::can_error::CanError;
use crate::mailbox::TxPool;
use crate::monitor::{BusErrorMonitor, ErrorStatus};
use crate::peripheral::{Interrupts, Peripheral};
use crate::{CanModule, Shared};

impl<'a, P: Peripheral, const RX: usize, const TX: usize> CanModule<'a, P, RX, TX> {
    /// Sends transmit slot `index` with `payload` as its data.
    ///
    /// The frame goes straight to the mailbox when it is free and nothing is
    /// queued, otherwise it waits for the next transmit-complete interrupt.
    /// Never blocks.
    ///
    /// # Errors
    ///
    /// * [`CanError::TxOverflow`] - the slot still held an unsent frame. It
    ///   now holds the new payload and stays queued.
    /// * [`CanError::TxBusy`] - the mailbox refused the frame, it is queued.
    pub fn send(&self, index: usize, payload: &[u8]) -> Result<(), CanError> {
        critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let Shared {
                peripheral,
                tx,
                monitor,
            } = &mut *shared;

            // Mailbox went idle without a completion, the hardware dropped the frame
            if tx.in_flight() && peripheral.tx_ready() {
                if cfg!(feature = "debuginfo") {
                    log::info!("CAN mailbox idle without completion, releasing it");
                }
                tx.release();
            }

            let slot = tx.slot_mut(index)?;
            let overflow = slot.pending;
            slot.frame.write_payload(payload);
            let (frame, sync) = (slot.frame, slot.sync);

            let mut result = Ok(());

            if overflow {
                // bootup message may still be waiting for a bus partner
                if !tx.first_tx() {
                    monitor.flag(ErrorStatus::TX_OVERFLOW);
                }
                result = Err(CanError::TxOverflow);
            } else if !tx.in_flight() && tx.pending_count() == 0 && peripheral.tx_ready() {
                match peripheral.send_async(&frame) {
                    Ok(()) => {
                        tx.mark_in_flight(sync);
                        enable_tx_interrupt(peripheral);
                        if cfg!(feature = "debuginfo") {
                            log::info!("Sent slot #{} ID {:#05x}", index, frame.std_id());
                        }
                        return Ok(());
                    }
                    Err(err) => {
                        // stays queued, the next send or completion picks it up
                        log::error!("CAN send of slot #{} failed: {:?}", index, err);
                        tx.enqueue(index)?;
                        enable_tx_interrupt(peripheral);
                        return Err(CanError::TxBusy);
                    }
                }
            } else {
                tx.enqueue(index)?;
            }

            enable_tx_interrupt(peripheral);

            // Nothing in the mailbox means no completion will come to drain the queue
            if !tx.in_flight() && peripheral.tx_ready() && !submit_next(peripheral, tx, monitor) {
                disable_tx_interrupt(peripheral);
            }

            result
        })
    }

    /// Transmit-complete interrupt: hands the next waiting slot to the mailbox.
    ///
    /// The TX interrupt is switched off once nothing is left in flight.
    pub fn on_tx_complete(&self) {
        critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let Shared {
                peripheral,
                tx,
                monitor,
            } = &mut *shared;

            // A send refilled the mailbox before this event got handled, its own completion follows
            if tx.in_flight() && !peripheral.tx_ready() {
                return;
            }

            tx.complete();

            if !submit_next(peripheral, tx, monitor) {
                disable_tx_interrupt(peripheral);
            }
        })
    }

    /// Withdraws synchronous frames that have not been sent yet, to be called
    /// right before a new SYNC goes out.
    ///
    /// Returns whether anything was withdrawn, which also raises
    /// [`ErrorStatus::TX_PDO_LATE`].
    pub fn cancel_pending_sync(&self) -> bool {
        critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let Shared { tx, monitor, .. } = &mut *shared;

            let dropped = tx.drop_pending_sync();
            if dropped {
                monitor.flag(ErrorStatus::TX_PDO_LATE);
            }
            dropped
        })
    }
}

fn enable_tx_interrupt<P: Peripheral>(peripheral: &mut P) {
    if let Err(err) = peripheral.enable_interrupts(Interrupts::TX) {
        log::error!("CAN tx interrupt enable failed: {:?}", err);
    }
}

fn disable_tx_interrupt<P: Peripheral>(peripheral: &mut P) {
    if let Err(err) = peripheral.disable_interrupts(Interrupts::TX) {
        log::error!("CAN tx interrupt disable failed: {:?}", err);
    }
}

/// Moves waiting slots into the mailbox, lowest index first, until one is
/// accepted.
///
/// Returns whether a frame is in flight afterwards. Every frame the mailbox
/// rejects is lost, counted and flagged as [`ErrorStatus::TX_OVERFLOW`].
fn submit_next<P: Peripheral, const N: usize>(
    peripheral: &mut P,
    tx: &mut TxPool<N>,
    monitor: &mut BusErrorMonitor,
) -> bool {
    while let Some((frame, sync)) = tx.dequeue() {
        match peripheral.send_async(&frame) {
            Ok(()) => {
                tx.mark_in_flight(sync);
                if cfg!(feature = "debuginfo") {
                    log::info!("Sent queued ID {:#05x}, {} left", frame.std_id(), tx.pending_count());
                }
                return true;
            }
            Err(err) => {
                log::error!("CAN send of queued ID {:#05x} failed: {:?}", frame.std_id(), err);
                tx.record_dropped();
                monitor.flag(ErrorStatus::TX_OVERFLOW);
            }
        }
    }

    false
}
