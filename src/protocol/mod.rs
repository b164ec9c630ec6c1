//! # Protocol Layer
//!
//! The CONNECT (CNXN) exchange that opens every transport session.
//!
//! ## Components
//! - **Banner**: parser and renderers for the CNXN banner text
//! - **Handshake**: device-side negotiation of version, max payload and features
//! - **Session**: async driver running the exchange over a framed stream
//!
//! ## Handshake Flow
//! ```text
//! host   -> CNXN(version, maxdata, "host::features=a,b,c")
//! device <- CNXN(min(version), min(maxdata), "device:<serial>:ro.product.*;features=a,b;")
//! ```

pub mod banner;
pub mod handshake;
pub mod session;
