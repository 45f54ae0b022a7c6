//! Message transfer records
//!
//! A transfer carries one command and its response. The 32-bit protocol
//! header packs message id, message type, protocol id and sequence token;
//! the transport hands that header upward when a response lands.

use heapless::Vec;

use crate::transport::MAX_MSG_SIZE;

// ============================================================================
// Message Header
// ============================================================================

const MSG_ID_MASK: u32 = 0xff;
const MSG_TYPE_SHIFT: u32 = 8;
const MSG_TYPE_MASK: u32 = 0x3;
const MSG_PROTOCOL_ID_SHIFT: u32 = 10;
const MSG_PROTOCOL_ID_MASK: u32 = 0xff;
const MSG_TOKEN_SHIFT: u32 = 18;
const MSG_TOKEN_MASK: u32 = 0x3ff;

/// Largest sequence token that fits in the header
pub const MSG_TOKEN_MAX: u16 = MSG_TOKEN_MASK as u16;

/// Numeric selector for a logical sub-protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolId(pub u8);

impl ProtocolId {
    pub const BASE: Self = Self(0x10);
    pub const POWER: Self = Self(0x11);
    pub const SYSTEM: Self = Self(0x12);
    pub const PERF: Self = Self(0x13);
    pub const CLOCK: Self = Self(0x14);
    pub const SENSOR: Self = Self(0x15);
    pub const RESET: Self = Self(0x16);
}

/// Message type field of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Command = 0,
    DelayedResponse = 2,
    Notification = 3,
}

impl MessageType {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Command),
            2 => Some(Self::DelayedResponse),
            3 => Some(Self::Notification),
            _ => None,
        }
    }
}

/// Decoded protocol message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgHeader {
    pub id: u8,
    pub msg_type: MessageType,
    pub protocol_id: ProtocolId,
    /// Sequence token matching a response to its command
    pub seq: u16,
}

impl MsgHeader {
    pub fn command(protocol_id: ProtocolId, id: u8, seq: u16) -> Self {
        Self {
            id,
            msg_type: MessageType::Command,
            protocol_id,
            seq: seq & MSG_TOKEN_MAX,
        }
    }

    /// Pack into the 32-bit wire header
    pub fn pack(&self) -> u32 {
        (self.id as u32 & MSG_ID_MASK)
            | ((self.msg_type as u32 & MSG_TYPE_MASK) << MSG_TYPE_SHIFT)
            | ((self.protocol_id.0 as u32 & MSG_PROTOCOL_ID_MASK) << MSG_PROTOCOL_ID_SHIFT)
            | ((self.seq as u32 & MSG_TOKEN_MASK) << MSG_TOKEN_SHIFT)
    }

    /// Unpack a 32-bit wire header; `None` for a reserved message type
    pub fn unpack(raw: u32) -> Option<Self> {
        let msg_type = MessageType::from_u8(((raw >> MSG_TYPE_SHIFT) & MSG_TYPE_MASK) as u8)?;
        Some(Self {
            id: (raw & MSG_ID_MASK) as u8,
            msg_type,
            protocol_id: ProtocolId(((raw >> MSG_PROTOCOL_ID_SHIFT) & MSG_PROTOCOL_ID_MASK) as u8),
            seq: ((raw >> MSG_TOKEN_SHIFT) & MSG_TOKEN_MASK) as u16,
        })
    }
}

/// Sequence token carried by a raw header
pub fn header_token(raw: u32) -> u16 {
    ((raw >> MSG_TOKEN_SHIFT) & MSG_TOKEN_MASK) as u16
}

// ============================================================================
// Transfer Record
// ============================================================================

/// Fixed-capacity message payload
pub type Payload = Vec<u8, MAX_MSG_SIZE>;

/// One command/response exchange
#[derive(Debug, Clone)]
pub struct Xfer {
    pub hdr: MsgHeader,
    /// Firmware status word of the response
    pub status: i32,
    /// Encoded command payload
    pub tx: Payload,
    /// Response payload, filled by `fetch_response`
    pub rx: Payload,
    /// Expected response length; zero accepts whatever firmware wrote
    pub rx_len: usize,
}

impl Xfer {
    /// Build a command transfer, rejecting payloads over the mailbox size
    pub fn new(hdr: MsgHeader, request: &[u8]) -> Option<Self> {
        let mut tx = Payload::new();
        tx.extend_from_slice(request).ok()?;
        Some(Self {
            hdr,
            status: 0,
            tx,
            rx: Payload::new(),
            rx_len: 0,
        })
    }

    /// Clear response state before the transfer is reused
    pub fn reset_rx(&mut self) {
        self.status = 0;
        self.rx.clear();
    }
}
