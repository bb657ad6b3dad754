//! Errors relating to the CAN module

use core::fmt;

use embedded_hal::can::{Error, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanError {
    /// Bad slot/filter index, zero sized tables or an out of range length.
    IllegalArgument,
    /// Requested bitrate has no entry in the timing table, or the peripheral rejected it.
    IllegalBaudrate,
    /// Peripheral power/init/mode call failed, or the module is in the wrong state.
    InvalidState,
    /// Slot was submitted again before its previous frame left. The new data still occupies the slot.
    TxOverflow,
    /// Hardware refused the immediate hand-off. The frame stays queued.
    TxBusy,
}

impl CanError {
    pub fn get_error_message(&self) -> &'static str {
        match self {
            CanError::IllegalArgument => "Illegal argument, check indices and lengths",
            CanError::IllegalBaudrate => "Bitrate not supported by the timing table",
            CanError::InvalidState => "CAN peripheral is not in a usable state",
            CanError::TxOverflow => "Transmit slot overflow, previous frame not yet sent",
            CanError::TxBusy => "Transmit mailbox busy, frame queued",
        }
    }
}

impl fmt::Display for CanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get_error_message())
    }
}

impl Error for CanError {
    fn kind(&self) -> ErrorKind {
        match self {
            CanError::TxOverflow => ErrorKind::Overrun,
            _ => ErrorKind::Other,
        }
    }
}
