//! CAN frames as they are queued, sent and dispatched

use embedded_hal::can::{Frame, Id, StandardId};

/// Bits of the raw identifier holding the 11-bit CAN-ID.
pub const CAN_STD_ID_MASK: u16 = 0x7FF;
/// Bit of the raw identifier flagging a remote transmission request.
pub const CAN_RTR_FLAG: u16 = 0x8000;
/// Classic CAN payload size.
pub const CAN_MAX_DLC: u8 = 8;

/// Encodes an 11-bit identifier and RTR flag into the raw form used by
/// frames and filters.
pub const fn encode_ident(ident: u16, rtr: bool) -> u16 {
    (ident & CAN_STD_ID_MASK) | if rtr { CAN_RTR_FLAG } else { 0 }
}

/// One classic CAN frame with a standard identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanFrame {
    ident: u16,
    dlc: u8,
    data: [u8; 8],
}

impl CanFrame {
    /// Builds a frame from its raw parts, as a peripheral reports it.
    ///
    /// Returns `None` when `dlc` is above 8. Only the first `dlc` bytes of
    /// `data` are kept, missing bytes are zero.
    pub fn from_raw(ident: u16, dlc: u8, data: &[u8]) -> Option<Self> {
        if dlc > CAN_MAX_DLC {
            return None;
        }

        let mut frame = Self {
            ident: ident & (CAN_STD_ID_MASK | CAN_RTR_FLAG),
            dlc,
            data: [0; 8],
        };
        let len = data.len().min(dlc as usize);
        frame.data[..len].copy_from_slice(&data[..len]);

        Some(frame)
    }

    /// Raw identifier, CAN-ID plus [`CAN_RTR_FLAG`].
    pub fn raw_ident(&self) -> u16 {
        self.ident
    }

    /// 11-bit CAN-ID without the RTR flag.
    pub fn std_id(&self) -> u16 {
        self.ident & CAN_STD_ID_MASK
    }

    pub fn is_rtr(&self) -> bool {
        self.ident & CAN_RTR_FLAG != 0
    }

    /// Data length code, the number of payload bytes on the wire.
    pub fn len(&self) -> usize {
        self.dlc as usize
    }

    pub fn is_empty(&self) -> bool {
        self.dlc == 0
    }

    /// Payload bytes up to the data length, also for remote frames.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.dlc as usize]
    }

    pub(crate) fn set_header(&mut self, ident: u16, dlc: u8) {
        self.ident = ident;
        self.dlc = dlc;
    }

    /// Copies `payload` over the first bytes of the frame data, never past the DLC.
    pub(crate) fn write_payload(&mut self, payload: &[u8]) {
        let len = payload.len().min(self.dlc as usize);
        self.data[..len].copy_from_slice(&payload[..len]);
    }
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Standard(id) if data.len() <= CAN_MAX_DLC as usize => {
                CanFrame::from_raw(id.as_raw(), data.len() as u8, data)
            }
            _ => None,
        }
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        match id.into() {
            Id::Standard(id) if dlc <= CAN_MAX_DLC as usize => {
                CanFrame::from_raw(encode_ident(id.as_raw(), true), dlc as u8, &[])
            }
            _ => None,
        }
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        self.is_rtr()
    }

    fn id(&self) -> Id {
        // std_id() is masked to 11 bits so this never falls back
        Id::Standard(StandardId::new(self.std_id()).unwrap_or(StandardId::ZERO))
    }

    fn dlc(&self) -> usize {
        self.len()
    }

    fn data(&self) -> &[u8] {
        if self.is_rtr() {
            &[]
        } else {
            self.payload()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::can::ExtendedId;

    #[test]
    fn from_raw_keeps_only_dlc_bytes() {
        let frame = CanFrame::from_raw(0x181, 2, &[1, 2, 3, 4]).unwrap();
        assert_eq!(frame.payload(), &[1, 2]);
        assert_eq!(frame.std_id(), 0x181);
        assert!(!frame.is_rtr());

        assert!(CanFrame::from_raw(0x181, 9, &[]).is_none());
    }

    #[test]
    fn remote_frames_carry_the_rtr_flag() {
        let id = StandardId::new(0x701).unwrap();
        let frame = CanFrame::new_remote(id, 1).unwrap();

        assert!(frame.is_remote_frame());
        assert_eq!(frame.raw_ident(), 0x701 | CAN_RTR_FLAG);
        assert_eq!(frame.dlc(), 1);
        assert!(frame.data().is_empty());
    }

    #[test]
    fn extended_ids_are_rejected() {
        let id = ExtendedId::new(0x1234_5678).unwrap();
        assert!(CanFrame::new(id, &[0]).is_none());
        assert!(CanFrame::new(StandardId::new(0x80).unwrap(), &[0; 9]).is_none());
    }
}
