use crate::filter::FilterEntry;
use crate::peripheral::{Peripheral, Received};
use crate::CanModule;

impl<'a, P: Peripheral, const RX: usize, const TX: usize> CanModule<'a, P, RX, TX> {
    /// Receive-ready interrupt: takes the frame, re-arms the receive request
    /// and hands the frame to the consumer of the first matching filter.
    ///
    /// Frames no filter takes are dropped silently.
    pub fn on_rx(&self) {
        let received = critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let received = shared.peripheral.take_received();

            if let Err(err) = shared.peripheral.read_async() {
                log::error!("CAN receive request failed: {:?}", err);
            }

            received
        });

        if let Some(received) = received {
            self.dispatch(&received);
        }
    }

    /// Receive overrun: a frame was lost, keep receiving.
    pub fn on_rx_overrun(&self) {
        log::warn!("CAN receive overrun");

        critical_section::with(|cs| {
            if let Err(err) = self.shared.borrow_ref_mut(cs).peripheral.read_async() {
                log::error!("CAN receive request failed: {:?}", err);
            }
        });
    }

    // Runs outside the critical section, the consumer may send a response
    fn dispatch(&self, received: &Received) {
        let ident = received.frame.raw_ident();

        let matched: Option<(usize, &FilterEntry<'a>)> = if self.config.hw_filters {
            // Hardware picked the channel, make sure the table still agrees
            received
                .filter_hit
                .and_then(|index| self.filters.check(index, ident).map(|entry| (index, entry)))
        } else {
            self.filters.find(ident)
        };

        match matched {
            Some((index, entry)) => {
                if cfg!(feature = "debuginfo") {
                    log::info!(
                        "Received {}-byte message w/ ID {:#05x} on filter #{}",
                        received.frame.len(),
                        received.frame.std_id(),
                        index
                    );
                }
                entry.consumer.receive(&received.frame);
            }
            None => {
                if cfg!(feature = "debuginfo") {
                    log::info!("Dropped message w/ ID {:#05x}", received.frame.std_id());
                }
            }
        }
    }
}
