//! Data structures representing the messages going over the wire
//!
//! A message is a fixed 20 byte [`Header`], the payload and the authentication tag. All
//! multi-byte header fields are big-endian. The tag is tracked separately from the
//! payload; on the wire it follows the payload and its length is fixed by the
//! authentication algorithm in use, so the receiver needs to know it to split a frame.
//!
//! ```text
//! offset 0  u32  length                 total encoded size, header and tag included
//! offset 4  u32  message_id
//! offset 8  u8   flags                  bit0 encrypted, bit1 authentic, bit2 compressed,
//!                                       bits 5-7 version
//! offset 9  u8   command
//! offset 10 u16  channel_id             0 is invalid
//! offset 12 u32  encryption_key_id
//! offset 16 u32  authentication_key_id
//! ```
//!
//! # Example
//!
//! ```
//! use qtunnel::msgs::{Message, HEADER_SIZE};
//!
//! let mut msg = Message::new(7, b"ping".to_vec());
//! msg.tag = vec![0xaa; 12];
//! msg.header.set_length(msg.encoded_len() as u32);
//!
//! let wire = msg.to_wire();
//! assert_eq!(wire.len(), HEADER_SIZE + 4 + 12);
//! assert_eq!(&wire[..4], &[0, 0, 0, 36]);
//!
//! let back = Message::from_wire(&wire, 12).unwrap();
//! assert_eq!(back, msg);
//! ```

use std::fmt;
use std::mem::size_of;

use static_assertions::const_assert_eq;
use thiserror::Error;
use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// Size of the [`Header`] in bytes
pub const HEADER_SIZE: usize = 20;

/// Version written to and expected in every header
pub const PROTOCOL_VERSION: u8 = 1;

const FLAG_ENCRYPTED: u8 = 0x01;
const FLAG_AUTHENTIC: u8 = 0x02;
const FLAG_COMPRESSED: u8 = 0x04;
const VERSION_SHIFT: u8 = 5;

#[repr(packed)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    length: U32<BigEndian>,
    message_id: U32<BigEndian>,
    flags: u8,
    command: u8,
    channel_id: U16<BigEndian>,
    encryption_key_id: U32<BigEndian>,
    authentication_key_id: U32<BigEndian>,
}

const_assert_eq!(size_of::<Header>(), HEADER_SIZE);

impl Header {
    pub fn length(&self) -> u32 {
        self.length.get()
    }

    pub fn set_length(&mut self, length: u32) {
        self.length.set(length);
    }

    pub fn message_id(&self) -> u32 {
        self.message_id.get()
    }

    pub fn set_message_id(&mut self, id: u32) {
        self.message_id.set(id);
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    pub fn set_command(&mut self, command: u8) {
        self.command = command;
    }

    pub fn channel_id(&self) -> u16 {
        self.channel_id.get()
    }

    pub fn set_channel_id(&mut self, id: u16) {
        self.channel_id.set(id);
    }

    pub fn encryption_key_id(&self) -> u32 {
        self.encryption_key_id.get()
    }

    pub fn set_encryption_key_id(&mut self, id: u32) {
        self.encryption_key_id.set(id);
    }

    pub fn authentication_key_id(&self) -> u32 {
        self.authentication_key_id.get()
    }

    pub fn set_authentication_key_id(&mut self, id: u32) {
        self.authentication_key_id.set(id);
    }

    /// The raw flags byte, version bits included
    pub fn flags(&self) -> u8 {
        self.flags
    }

    fn set_flag(&mut self, flag: u8, on: bool) {
        match on {
            true => self.flags |= flag,
            false => self.flags &= !flag,
        }
    }

    pub fn encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn set_encrypted(&mut self, on: bool) {
        self.set_flag(FLAG_ENCRYPTED, on);
    }

    pub fn authentic(&self) -> bool {
        self.flags & FLAG_AUTHENTIC != 0
    }

    pub fn set_authentic(&mut self, on: bool) {
        self.set_flag(FLAG_AUTHENTIC, on);
    }

    pub fn compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    pub fn set_compressed(&mut self, on: bool) {
        self.set_flag(FLAG_COMPRESSED, on);
    }

    /// Protocol version, 0 to 7
    pub fn version(&self) -> u8 {
        self.flags >> VERSION_SHIFT
    }

    pub fn set_version(&mut self, version: u8) {
        self.flags = (self.flags & ((1 << VERSION_SHIFT) - 1)) | ((version & 0x07) << VERSION_SHIFT);
    }
}

impl Default for Header {
    fn default() -> Self {
        let mut header = Self::new_zeroed();
        header.set_version(PROTOCOL_VERSION);
        header
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("length", &self.length())
            .field("message_id", &self.message_id())
            .field("encrypted", &self.encrypted())
            .field("authentic", &self.authentic())
            .field("compressed", &self.compressed())
            .field("version", &self.version())
            .field("command", &self.command())
            .field("channel_id", &self.channel_id())
            .field("encryption_key_id", &self.encryption_key_id())
            .field("authentication_key_id", &self.authentication_key_id())
            .finish()
    }
}

/// A frame could not be split into header, payload and tag
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("buffer size mismatch, required {required_size} but found {actual_size}")]
pub struct BufferSizeMismatch {
    pub required_size: usize,
    pub actual_size: usize,
}

/// One message with header, payload and authentication tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub payload: Vec<u8>,
    pub tag: Vec<u8>,
}

impl Message {
    /// A message ready for encoding; the channel fills in the remaining header fields
    pub fn new(command: u8, payload: Vec<u8>) -> Self {
        let mut header = Header::default();
        header.set_command(command);
        header.set_length((HEADER_SIZE + payload.len()) as u32);
        Self {
            header,
            payload,
            tag: Vec::new(),
        }
    }

    /// Asks the channel to encrypt the payload on encode
    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.header.set_encrypted(encrypt);
        self
    }

    /// Size of the message on the wire
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + self.tag.len()
    }

    /// Whether the length field in the header matches the actual size
    pub fn is_length_consistent(&self) -> bool {
        self.header.length() as usize == self.encoded_len()
    }

    /// Header, payload and tag in one buffer
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(self.header.as_bytes());
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Splits a frame produced by [`Message::to_wire`]; the last `tag_len` bytes are the tag.
    ///
    /// The length field is not checked here, decoding the message does that.
    pub fn from_wire(bytes: &[u8], tag_len: usize) -> Result<Self, BufferSizeMismatch> {
        let mismatch = || BufferSizeMismatch {
            required_size: HEADER_SIZE + tag_len,
            actual_size: bytes.len(),
        };

        let header = Header::read_from_prefix(bytes).ok_or_else(mismatch)?;
        let body = &bytes[HEADER_SIZE..];
        let payload_len = body.len().checked_sub(tag_len).ok_or_else(mismatch)?;
        let (payload, tag) = body.split_at(payload_len);

        Ok(Self {
            header,
            payload: payload.to_vec(),
            tag: tag.to_vec(),
        })
    }
}
