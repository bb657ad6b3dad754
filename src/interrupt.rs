//! Interrupt related things
//!
//! The peripheral reports unit events (bus state changes) and object events
//! (transmit complete, receive ready, receive overrun). A vendor interrupt
//! handler with a fixed signature finds its module through a [`Registry`]
//! keyed by peripheral index:
//!
//! ```ignore
//! static CAN: Registry<CanModule<'static, Can0, 16, 16>, 1> = Registry::new();
//!
//! extern "C" fn can_obj_event(can_idx: u32, event: u32) {
//!     CAN.object_event(can_idx as usize, event);
//! }
//! ```

use core::cell::RefCell;

use critical_section::Mutex;

use crate::can_error::CanError;
use crate::peripheral::Peripheral;
use crate::CanModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitEvent {
    Inactive,
    Active,
    Warning,
    Passive,
    BusOff,
}

impl TryFrom<u32> for UnitEvent {
    type Error = u32;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(UnitEvent::Inactive),
            1 => Ok(UnitEvent::Active),
            2 => Ok(UnitEvent::Warning),
            3 => Ok(UnitEvent::Passive),
            4 => Ok(UnitEvent::BusOff),
            _ => Err(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectEvent {
    TxComplete,
    Rx,
    RxOverrun,
}

impl TryFrom<u32> for ObjectEvent {
    type Error = u32;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(ObjectEvent::TxComplete),
            1 => Ok(ObjectEvent::Rx),
            2 => Ok(ObjectEvent::RxOverrun),
            _ => Err(raw),
        }
    }
}

impl<'a, P: Peripheral, const RX: usize, const TX: usize> CanModule<'a, P, RX, TX> {
    pub fn on_object_event(&self, event: ObjectEvent) {
        match event {
            ObjectEvent::TxComplete => self.on_tx_complete(),
            ObjectEvent::Rx => self.on_rx(),
            ObjectEvent::RxOverrun => self.on_rx_overrun(),
        }
    }

    /// Bus state changes are only reported, [`CanModule::process`] derives the status.
    pub fn on_unit_event(&self, event: UnitEvent) {
        match event {
            UnitEvent::Inactive => log::info!("CAN peripheral entered inactive state"),
            UnitEvent::Active => log::info!("CAN peripheral entered active state"),
            UnitEvent::Warning => log::warn!("CAN peripheral reached error warning"),
            UnitEvent::Passive => log::warn!("CAN peripheral entered error passive state"),
            UnitEvent::BusOff => log::warn!("CAN bus turned off"),
        }
    }
}

/// Modules reachable from interrupt entry points, by peripheral index.
pub struct Registry<M: 'static, const N: usize> {
    modules: Mutex<RefCell<[Option<&'static M>; N]>>,
}

impl<M: 'static, const N: usize> Registry<M, N> {
    pub const fn new() -> Self {
        Self {
            modules: Mutex::new(RefCell::new([None; N])),
        }
    }

    pub fn register(&self, index: usize, module: &'static M) -> Result<(), CanError> {
        critical_section::with(|cs| {
            let mut modules = self.modules.borrow_ref_mut(cs);
            let slot = modules.get_mut(index).ok_or(CanError::IllegalArgument)?;
            *slot = Some(module);
            Ok(())
        })
    }

    pub fn unregister(&self, index: usize) -> Option<&'static M> {
        critical_section::with(|cs| {
            self.modules
                .borrow_ref_mut(cs)
                .get_mut(index)
                .and_then(Option::take)
        })
    }

    pub fn get(&self, index: usize) -> Option<&'static M> {
        critical_section::with(|cs| self.modules.borrow_ref(cs).get(index).copied().flatten())
    }
}

impl<P: Peripheral, const RX: usize, const TX: usize, const N: usize>
    Registry<CanModule<'static, P, RX, TX>, N>
{
    /// Routes a raw object event code to the module at `index`.
    pub fn object_event(&self, index: usize, raw: u32) {
        let module = match self.get(index) {
            Some(module) => module,
            None => {
                log::warn!("CAN object event {} for unregistered peripheral {}", raw, index);
                return;
            }
        };

        match ObjectEvent::try_from(raw) {
            Ok(event) => module.on_object_event(event),
            Err(raw) => log::warn!("Undefined CAN object event {}", raw),
        }
    }

    /// Routes a raw unit event code to the module at `index`.
    pub fn unit_event(&self, index: usize, raw: u32) {
        let module = match self.get(index) {
            Some(module) => module,
            None => {
                log::warn!("CAN unit event {} for unregistered peripheral {}", raw, index);
                return;
            }
        };

        match UnitEvent::try_from(raw) {
            Ok(event) => module.on_unit_event(event),
            Err(raw) => log::warn!("Undefined CAN unit event {}", raw),
        }
    }
}

impl<M: 'static, const N: usize> Default for Registry<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
