//! # Packet Encoding
//!
//! Fixed 24-byte little-endian header followed by the payload:
//!
//! ```text
//! command | arg0 | arg1 | length | checksum | magic | payload[length]
//! ```
//!
//! `magic` is the bitwise complement of `command` and `checksum` is the
//! wrapping byte sum of the payload. Both are derived on encode and verified
//! on decode, magic first.

use crate::core::command::{command_name, Command};
use crate::error::{ProtocolError, Result};
use bytes::{BufMut, BytesMut};
use std::fmt;

/// Size of the fixed transport header: six little-endian `u32` fields.
pub const HEADER_SIZE: usize = 24;

/// Byte-sum of the payload, wrapping modulo 2^32.
///
/// This is a transit integrity aid only. It is trivially forgeable.
#[inline]
pub fn checksum(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |sum, &byte| sum.wrapping_add(u32::from(byte)))
}

/// Structural complement every header must carry.
#[inline]
pub const fn magic_for(command: u32) -> u32 {
    command ^ 0xFFFF_FFFF
}

/// Payload length as carried in the header.
#[inline]
pub fn wire_length(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ProtocolError::OversizedPacket(len))
}

/// The 24-byte header, parsed without any integrity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub command: u32,
    pub arg0: u32,
    pub arg1: u32,
    pub length: u32,
    pub checksum: u32,
    pub magic: u32,
}

impl Header {
    /// Read the six header fields from the start of `buf`.
    ///
    /// Only the buffer length is checked; magic and checksum are left to the caller.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(ProtocolError::HeaderTooShort { len: buf.len() });
        }

        let field = |index: usize| {
            let start = index * 4;
            u32::from_le_bytes([buf[start], buf[start + 1], buf[start + 2], buf[start + 3]])
        };

        Ok(Self {
            command: field(0),
            arg0: field(1),
            arg1: field(2),
            length: field(3),
            checksum: field(4),
            magic: field(5),
        })
    }

    /// Build the header that describes `payload` under `command`.
    ///
    /// # Errors
    /// Returns `ProtocolError::OversizedPacket` if the payload length does not
    /// fit the 32-bit length field.
    pub fn describe(command: u32, arg0: u32, arg1: u32, payload: &[u8]) -> Result<Self> {
        Ok(Self {
            command,
            arg0,
            arg1,
            length: wire_length(payload.len())?,
            checksum: checksum(payload),
            magic: magic_for(command),
        })
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic == magic_for(self.command)
    }

    pub fn put(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.command);
        dst.put_u32_le(self.arg0);
        dst.put_u32_le(self.arg1);
        dst.put_u32_le(self.length);
        dst.put_u32_le(self.checksum);
        dst.put_u32_le(self.magic);
    }
}

/// A transport packet. Length, checksum and magic are always derived from
/// `command` and `payload`, so a `Packet` value cannot be internally inconsistent.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    pub command: u32,
    pub arg0: u32,
    pub arg1: u32,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(command: Command, arg0: u32, arg1: u32, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            command: command.code(),
            arg0,
            arg1,
            payload: payload.into(),
        }
    }

    pub fn length(&self) -> usize {
        self.payload.len()
    }

    pub fn checksum(&self) -> u32 {
        checksum(&self.payload)
    }

    pub fn magic(&self) -> u32 {
        magic_for(self.command)
    }

    pub fn header(&self) -> Result<Header> {
        Header::describe(self.command, self.arg0, self.arg1, &self.payload)
    }

    /// The recognised command, if any.
    pub fn kind(&self) -> Option<Command> {
        Command::from_code(self.command)
    }

    pub fn is(&self, command: Command) -> bool {
        self.command == command.code()
    }

    /// Encoded size on the wire.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Append the encoded packet to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) -> Result<()> {
        let header = self.header()?;
        dst.reserve(self.wire_len());
        header.put(dst);
        dst.extend_from_slice(&self.payload);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self.command, self.arg0, self.arg1, &self.payload)
    }

    /// Decode exactly one packet from the front of `buf`, verifying magic and
    /// checksum. Bytes past the declared payload are left unconsumed.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let header = Header::parse(buf)?;

        if !header.has_valid_magic() {
            return Err(ProtocolError::InvalidMagic {
                expected: magic_for(header.command),
                found: header.magic,
            });
        }

        let declared = header.length as usize;
        let available = buf.len() - HEADER_SIZE;
        if available < declared {
            return Err(ProtocolError::IncompletePayload {
                declared,
                available,
            });
        }

        let payload = &buf[HEADER_SIZE..HEADER_SIZE + declared];
        let computed = checksum(payload);
        if computed != header.checksum {
            return Err(ProtocolError::InvalidChecksum {
                expected: header.checksum,
                computed,
            });
        }

        Ok(Self {
            command: header.command,
            arg0: header.arg0,
            arg1: header.arg1,
            payload: payload.to_vec(),
        })
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command", &command_name(self.command))
            .field("arg0", &self.arg0)
            .field("arg1", &self.arg1)
            .field("length", &self.payload.len())
            .finish()
    }
}

/// Encode a packet from its parts. Magic is always derived from `command`.
///
/// # Errors
/// Returns `ProtocolError::OversizedPacket` for a payload of 4 GiB or more.
pub fn encode(command: u32, arg0: u32, arg1: u32, payload: &[u8]) -> Result<Vec<u8>> {
    let header = Header::describe(command, arg0, arg1, payload)?;
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    header.put(&mut out);
    out.extend_from_slice(payload);
    Ok(out)
}

/// Decode one packet from the front of `buf`. See [`Packet::from_bytes`].
pub fn decode(buf: &[u8]) -> Result<Packet> {
    Packet::from_bytes(buf)
}
