//! # adb-wire
//!
//! Binary transport codec and CONNECT handshake negotiation for ADB-style
//! device/host peers.
//!
//! ## Layers
//! - [`core`]: command registry, packet encode/decode, stream framing
//! - [`protocol`]: banner grammar, device-side negotiation, session driver
//! - [`config`]: protocol limits, validated device properties, logging settings
//! - [`utils`]: logging setup
//!
//! ## Example
//! ```rust
//! use adb_wire::config::{DeviceProperties, ProtocolConfig, PROTOCOL_VERSION};
//! use adb_wire::protocol::handshake::{host_connect, DeviceConnection};
//!
//! let props = DeviceProperties::default()
//!     .with_model("Pixel 7")
//!     .with_features(["shell_v2", "cmd"]);
//! let mut device = DeviceConnection::new(&props, ProtocolConfig::default())?;
//!
//! let request = host_connect(PROTOCOL_VERSION, 8192, &["cmd", "foobar"], device.protocol())?;
//! let response = adb_wire::decode(&device.handle_connect(&request)?)?;
//!
//! assert_eq!(response.arg1, 4096);
//! assert_eq!(device.features(), ["cmd"]);
//! # Ok::<(), adb_wire::ProtocolError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use crate::core::command::{command_name, Command};
pub use crate::core::packet::{checksum, decode, encode, Packet};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::handshake::{ConnectionState, DeviceConnection};
