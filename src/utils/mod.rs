//! # Utility Modules
//!
//! Supporting utilities shared by the codec and the handshake.
//!
//! ## Components
//! - **Logging**: structured logging setup driven by [`LoggingConfig`](crate::config::LoggingConfig)

pub mod logging;
