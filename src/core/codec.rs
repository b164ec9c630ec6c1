//! Stream framing for `tokio_util::codec::Framed`.

use crate::config::DEFAULT_MAX_FRAME_PAYLOAD;
use crate::core::packet::{magic_for, Header, Packet, HEADER_SIZE};
use crate::error::{ProtocolError, Result};
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Frames transport packets over a byte stream.
///
/// The header is inspected as soon as 24 bytes are buffered so a bad magic or an
/// oversized length is rejected before the payload is read.
#[derive(Debug, Clone, Copy)]
pub struct AdbCodec {
    max_payload: usize,
}

impl AdbCodec {
    pub fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}

impl Default for AdbCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_PAYLOAD)
    }
}

impl Decoder for AdbCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let header = Header::parse(src)?;
        if !header.has_valid_magic() {
            warn!(command = header.command, magic = header.magic, "Rejecting frame with bad magic");
            return Err(ProtocolError::InvalidMagic {
                expected: magic_for(header.command),
                found: header.magic,
            });
        }

        let length = header.length as usize;
        if length > self.max_payload {
            warn!(length, max = self.max_payload, "Rejecting oversized frame");
            return Err(ProtocolError::OversizedPacket(length));
        }

        let frame_len = HEADER_SIZE + length;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_len);
        Packet::from_bytes(&frame).map(Some)
    }
}

impl Encoder<Packet> for AdbCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        if item.payload.len() > self.max_payload {
            return Err(ProtocolError::OversizedPacket(item.payload.len()));
        }
        item.write_to(dst)
    }
}
