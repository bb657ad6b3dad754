//! Receive filters routing frames to protocol objects

use crate::can_error::CanError;
use crate::frame::{encode_ident, CanFrame, CAN_RTR_FLAG, CAN_STD_ID_MASK};

/// A protocol object (SDO server, RPDO, NMT, ...) that takes frames matched
/// by its filter.
///
/// Called from the receive interrupt, so it must not block.
pub trait FrameConsumer: Sync {
    fn receive(&self, frame: &CanFrame);
}

#[derive(Clone, Copy)]
pub struct FilterEntry<'a> {
    /// Identifier in raw form, RTR flag included.
    pub ident: u16,
    pub mask: u16,
    pub consumer: &'a dyn FrameConsumer,
}

impl<'a> FilterEntry<'a> {
    pub fn new(ident: u16, mask: u16, rtr: bool, consumer: &'a dyn FrameConsumer) -> Self {
        Self {
            ident: encode_ident(ident, rtr),
            // RTR always has to match
            mask: (mask & CAN_STD_ID_MASK) | CAN_RTR_FLAG,
            consumer,
        }
    }

    pub fn matches(&self, raw_ident: u16) -> bool {
        (raw_ident ^ self.ident) & self.mask == 0
    }
}

impl<'a> core::fmt::Debug for FilterEntry<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FilterEntry")
            .field("ident", &self.ident)
            .field("mask", &self.mask)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FilterTable<'a, const N: usize> {
    entries: [Option<FilterEntry<'a>>; N],
}

impl<'a, const N: usize> Default for FilterTable<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> FilterTable<'a, N> {
    pub const fn new() -> Self {
        Self { entries: [None; N] }
    }

    pub fn clear(&mut self) {
        self.entries = [None; N];
    }

    /// Sets (or overwrites) the entry at `index`.
    pub fn set(&mut self, index: usize, entry: FilterEntry<'a>) -> Result<(), CanError> {
        let slot = self.entries.get_mut(index).ok_or(CanError::IllegalArgument)?;
        *slot = Some(entry);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&FilterEntry<'a>> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// Scans in index order, the first matching entry wins.
    pub fn find(&self, raw_ident: u16) -> Option<(usize, &FilterEntry<'a>)> {
        self.entries
            .iter()
            .enumerate()
            .find_map(|(index, entry)| match entry {
                Some(entry) if entry.matches(raw_ident) => Some((index, entry)),
                _ => None,
            })
    }

    /// Looks up the channel the hardware picked and checks it still agrees.
    pub fn check(&self, index: usize, raw_ident: u16) -> Option<&FilterEntry<'a>> {
        self.get(index).filter(|entry| entry.matches(raw_ident))
    }
}
