//! # Core Protocol Components
//!
//! Low-level packet handling: the command registry, the packet codec and the
//! stream framing codec.
//!
//! ## Components
//! - **Command**: the closed table of transport commands and their wire codes
//! - **Packet**: fixed-header packet format with checksum and magic verification
//! - **Codec**: Tokio codec for framing packets over byte streams
//!
//! ## Wire Format
//! ```text
//! [Command(4)] [Arg0(4)] [Arg1(4)] [Length(4)] [Checksum(4)] [Magic(4)] [Payload(N)]
//! ```
//! All header fields are little-endian `u32`. `Magic` is `Command ^ 0xFFFFFFFF` and
//! `Checksum` is the wrapping byte sum of the payload.
//!
//! ## Security
//! - The checksum detects transit corruption only; it is not a MAC
//! - The stream codec bounds the declared length before buffering the payload

pub mod codec;
pub mod command;
pub mod packet;
