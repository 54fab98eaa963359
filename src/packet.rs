//! MAC frame encoding and decoding
//!
//! Frames carry a 16-bit frame control field (big-endian on the wire),
//! an 8-bit sequence number and, for every type other than ACK, a PAN ID
//! followed by 16-bit destination and source addresses:
//!
//! ```text
//! | fcf (2) | seq (1) | pan id (2) | dest (2) | src (2) | payload ... |
//! ```
//!
//! ACK frames stop after the sequence number.

use bitflags::bitflags;
use heapless::Vec;
use strum::{Display, FromRepr};

use crate::codec::{decode_u16, encode_u16};
use crate::error::DecodeError;
use crate::{BROADCAST_ADDRESS, MAX_FRAME_LEN};

/// Length of an addressed (non-ACK) MAC header
pub const HEADER_LEN: usize = 9;

/// Length of an ACK frame
pub const ACK_FRAME_LEN: usize = 3;

/// Maximum payload carried by a single frame
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - HEADER_LEN;

const FRAME_TYPE_MASK: u16 = 0x0003;

bitflags! {
    /// Frame control flags, the frame type occupies the low two bits
    /// and is handled separately by [`FrameType`]
    pub struct FrameControl: u16 {
        const SECURITY_ENABLED = 0x0008;
        const FRAME_PENDING = 0x0010;
        const ACK_REQUEST = 0x0020;
        const INTRA_PAN = 0x0040;
        const DEST_ADDR_SHORT = 0x0800;
        const SRC_ADDR_SHORT = 0x8000;
    }
}

/// MAC frame types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameType {
    Beacon = 0,
    Data = 1,
    Ack = 2,
    Command = 3,
}

/// Addressing fields present on all frames other than ACKs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Addressing {
    pub pan_id: u16,
    pub destination: u16,
    pub source: u16,
}

/// Decoded MAC header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub frame_type: FrameType,
    pub ack_request: bool,
    pub intra_pan: bool,
    pub seq: u8,
    /// `None` for ACK frames
    pub addressing: Option<Addressing>,
}

impl Header {
    /// Build an addressed header for a data frame
    pub fn data(ack_request: bool, intra_pan: bool, pan_id: u16, destination: u16, source: u16, seq: u8) -> Self {
        Self {
            frame_type: FrameType::Data,
            ack_request,
            intra_pan,
            seq,
            addressing: Some(Addressing{ pan_id, destination, source }),
        }
    }

    /// Build the header of an ACK for the provided sequence number
    pub fn ack(seq: u8) -> Self {
        Self {
            frame_type: FrameType::Ack,
            ack_request: false,
            intra_pan: true,
            seq,
            addressing: None,
        }
    }

    /// Compute the frame control field for this header
    pub fn frame_control(&self) -> u16 {
        let mut fc = FrameControl::DEST_ADDR_SHORT | FrameControl::SRC_ADDR_SHORT;
        fc.set(FrameControl::ACK_REQUEST, self.ack_request);
        fc.set(FrameControl::INTRA_PAN, self.intra_pan);

        fc.bits() | self.frame_type as u16
    }

    /// Encoded header length
    pub fn len(&self) -> usize {
        match self.addressing {
            Some(_) => HEADER_LEN,
            None => ACK_FRAME_LEN,
        }
    }

    /// Write the header into the provided buffer, returning the encoded length
    pub fn encode(&self, buff: &mut [u8]) -> usize {
        encode_u16(self.frame_control(), &mut buff[0..]);
        buff[2] = self.seq;

        if let Some(a) = &self.addressing {
            encode_u16(a.pan_id, &mut buff[3..]);
            encode_u16(a.destination, &mut buff[5..]);
            encode_u16(a.source, &mut buff[7..]);
        }

        self.len()
    }

    /// Parse a header from the start of a frame, returning the header and its length
    pub fn decode(buff: &[u8]) -> Result<(Self, usize), DecodeError> {
        if buff.len() < ACK_FRAME_LEN {
            return Err(DecodeError::NotEnoughBytes);
        }

        let fc = decode_u16(&buff[0..]);
        let frame_type = FrameType::from_repr((fc & FRAME_TYPE_MASK) as u8)
            .ok_or(DecodeError::InvalidFrameType)?;
        let flags = FrameControl::from_bits_truncate(fc);

        let mut h = Header {
            frame_type,
            ack_request: flags.contains(FrameControl::ACK_REQUEST),
            intra_pan: flags.contains(FrameControl::INTRA_PAN),
            seq: buff[2],
            addressing: None,
        };

        if frame_type == FrameType::Ack {
            return Ok((h, ACK_FRAME_LEN))
        }

        if buff.len() < HEADER_LEN {
            return Err(DecodeError::NotEnoughBytes);
        }

        h.addressing = Some(Addressing {
            pan_id: decode_u16(&buff[3..]),
            destination: decode_u16(&buff[5..]),
            source: decode_u16(&buff[7..]),
        });

        Ok((h, HEADER_LEN))
    }
}

/// Packet object represents a MAC frame with owned storage.
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    pub header: Header,

    payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl Packet {
    /// Build a data packet, returns `None` if the payload does not fit in a frame
    pub fn data(header: Header, data: &[u8]) -> Option<Packet> {
        let payload = Vec::from_slice(data).ok()?;

        Some(Packet { header, payload })
    }

    /// Generate an ACK for the provided sequence number
    pub fn ack(seq: u8) -> Packet {
        Packet {
            header: Header::ack(seq),
            payload: Vec::new(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the packet, returning the payload storage
    pub fn into_payload(self) -> Vec<u8, MAX_PAYLOAD_LEN> {
        self.payload
    }

    /// Destination short address, `None` for ACKs
    pub fn destination(&self) -> Option<u16> {
        self.header.addressing.map(|a| a.destination)
    }

    pub fn is_broadcast(&self) -> bool {
        self.destination() == Some(BROADCAST_ADDRESS)
    }

    /// Encode the packet into the provided buffer, returning the frame length
    pub fn encode(&self, buff: &mut [u8]) -> usize {
        let mut len = self.header.encode(buff);

        buff[len..len + self.payload.len()].copy_from_slice(&self.payload);
        len += self.payload.len();

        len
    }

    /// Decode a packet from a received frame
    pub fn decode(buff: &[u8]) -> Result<Self, DecodeError> {
        if buff.len() > MAX_FRAME_LEN {
            return Err(DecodeError::TooLong);
        }

        let (header, n) = Header::decode(buff)?;

        let payload = Vec::from_slice(&buff[n..]).map_err(|_e| DecodeError::TooLong)?;

        Ok(Packet { header, payload })
    }
}
