//! # Error Types
//!
//! Error handling for the ADB transport codec and CONNECT negotiation.
//!
//! ## Error Categories
//! - **Format Errors**: header too short, payload shorter than declared, oversized frames
//! - **Integrity Errors**: magic mismatch, checksum mismatch
//! - **Lookup Errors**: unknown command names
//! - **Configuration Errors**: malformed property sources and settings
//! - **I/O Errors**: failures of the underlying byte stream
//!
//! Every codec failure is fail-fast. The caller discards the packet and either
//! resynchronizes or closes the stream; nothing here attempts partial recovery.
//!
//! ## Example Usage
//! ```rust
//! use adb_wire::core::packet::decode;
//! use adb_wire::error::ProtocolError;
//!
//! match decode(&[0u8; 3]) {
//!     Err(ProtocolError::HeaderTooShort { len }) => assert_eq!(len, 3),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Handshake errors
    pub const ERR_STREAM_CLOSED_BEFORE_CNXN: &str = "Stream closed before CNXN was received";

    /// Property source errors
    pub const ERR_PROPERTY_DELIMITER: &str = "Property value contains a banner delimiter";
    pub const ERR_PROPERTY_NUL: &str = "Property value contains a NUL byte";
    pub const ERR_FEATURE_EMPTY: &str = "Feature names cannot be empty";
    pub const ERR_FEATURE_DELIMITER: &str = "Feature name contains ',' or ';'";
}

// ProtocolError is the primary error type for all codec and handshake operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Header too short: {len} bytes (need 24)")]
    HeaderTooShort { len: usize },

    #[error("Invalid magic: expected {expected:#010x}, found {found:#010x}")]
    InvalidMagic { expected: u32, found: u32 },

    #[error("Incomplete payload: declared {declared} bytes, {available} available")]
    IncompletePayload { declared: usize, available: usize },

    #[error("Invalid checksum: expected {expected:#010x}, computed {computed:#010x}")]
    InvalidChecksum { expected: u32, computed: u32 },

    #[error("Unknown command name: {0:?}")]
    UnknownCommand(String),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Handshake failed: {0}")]
    HandshakeError(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// True for malformed framing: short header, short payload, oversized frame.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::HeaderTooShort { .. } | Self::IncompletePayload { .. } | Self::OversizedPacket(_)
        )
    }

    /// True when the frame parsed but its magic or checksum does not verify.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, Self::InvalidMagic { .. } | Self::InvalidChecksum { .. })
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
