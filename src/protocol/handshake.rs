//! CONNECT handshake negotiation.
//!
//! The device side consumes the host's CNXN packet, settles on a protocol
//! version, a max payload and a feature set, and answers with its own CNXN
//! carrying the device banner. The host side is reduced to building the
//! initial CNXN packet.
//!
//! **Lenient inbound parsing**
//! [`DeviceConnection::handle_connect`] treats the inbound packet as
//! address-of-record data: it requires a full 24-byte header but does not check
//! the magic or the checksum, and it takes whatever payload bytes are present up
//! to the declared length. Packets that arrive through
//! [`AdbCodec`](crate::core::codec::AdbCodec) are fully verified before they get
//! here; the raw entry point is for callers holding unverified bytes.
//!
//! **Per-Connection State**
//! Each [`DeviceConnection`] owns its properties and negotiation outcome, so
//! connections accepted in parallel never share mutable state.

use crate::config::{AdbConfig, DeviceProperties, PropertySource, ProtocolConfig};
use crate::core::command::{Command, A_CNXN};
use crate::core::packet::{Header, Packet, HEADER_SIZE};
use crate::error::Result;
use crate::protocol::banner::{self, Banner};

use tracing::{debug, instrument};

/// What the peer asked for in its CNXN packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub version: u32,
    pub max_payload: u32,
    pub banner: String,
    pub features: Vec<String>,
}

impl ConnectRequest {
    /// Parse a raw CNXN packet without verifying its magic or checksum.
    ///
    /// # Errors
    /// Returns `ProtocolError::HeaderTooShort` if `raw` holds fewer than 24 bytes.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let header = Header::parse(raw)?;
        let body = &raw[HEADER_SIZE..];
        let take = body.len().min(header.length as usize);
        Ok(Self::from_parts(header.arg0, header.arg1, &body[..take]))
    }

    pub fn from_packet(packet: &Packet) -> Self {
        Self::from_parts(packet.arg0, packet.arg1, &packet.payload)
    }

    fn from_parts(version: u32, max_payload: u32, payload: &[u8]) -> Self {
        let banner = String::from_utf8_lossy(payload).into_owned();
        let features = banner::parse_features(&banner);
        Self {
            version,
            max_payload,
            banner,
            features,
        }
    }

    /// Role the peer claims in its banner (`host`, `device`, ...), if the banner is well-formed.
    pub fn role(&self) -> Option<&str> {
        Banner::parse(&self.banner).map(|b| b.role)
    }
}

/// Negotiated state stored on a connection after a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub max_payload: u32,
    pub features: Vec<String>,
    pub banner: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
}

/// Filter `requested` down to what the device supports, keeping the requested order.
///
/// A device with no configured features restricts nothing and the request passes
/// through unchanged.
pub fn negotiate_features(requested: &[String], supported: &[String]) -> Vec<String> {
    if supported.is_empty() {
        return requested.to_vec();
    }
    requested
        .iter()
        .filter(|feature| supported.contains(feature))
        .cloned()
        .collect()
}

/// Device-side connection negotiating a single CNXN exchange.
#[derive(Debug, Clone)]
pub struct DeviceConnection {
    properties: DeviceProperties,
    protocol: ProtocolConfig,
    negotiated: Option<Negotiated>,
}

impl DeviceConnection {
    /// Load device properties from `source` once and start unconnected.
    ///
    /// # Errors
    /// Returns `ProtocolError::ConfigError` if the source fails to load or holds
    /// malformed properties, or if `protocol` is invalid.
    pub fn new(source: &impl PropertySource, protocol: ProtocolConfig) -> Result<Self> {
        protocol.validate_strict()?;
        let properties = source.load()?;
        debug!(
            serial = properties.serialno.as_deref().unwrap_or(""),
            features = properties.features.len(),
            "Loaded device properties"
        );
        Ok(Self {
            properties,
            protocol,
            negotiated: None,
        })
    }

    pub fn from_config(config: &AdbConfig) -> Result<Self> {
        Self::new(config, config.protocol)
    }

    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    pub fn serial(&self) -> Option<&str> {
        self.properties.serialno.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        if self.negotiated.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Unconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn negotiated(&self) -> Option<&Negotiated> {
        self.negotiated.as_ref()
    }

    /// Negotiated features; empty before the handshake.
    pub fn features(&self) -> &[String] {
        self.negotiated
            .as_ref()
            .map(|n| n.features.as_slice())
            .unwrap_or(&[])
    }

    /// Banner sent in the last CNXN response.
    pub fn banner(&self) -> Option<&str> {
        self.negotiated.as_ref().map(|n| n.banner.as_str())
    }

    /// Effective max payload: negotiated once connected, configured before.
    pub fn max_payload(&self) -> u32 {
        self.negotiated
            .as_ref()
            .map_or(self.protocol.max_payload, |n| n.max_payload)
    }

    /// Banner advertising every configured feature, without negotiating.
    pub fn device_banner(&self) -> String {
        banner::device_banner(&self.properties)
    }

    /// Handle a raw inbound CNXN packet and return the encoded response.
    ///
    /// Only a short header is an error. See the module docs for why magic and
    /// checksum are not verified on this path.
    #[instrument(skip(self, raw), fields(len = raw.len()))]
    pub fn handle_connect(&mut self, raw: &[u8]) -> Result<Vec<u8>> {
        let request = ConnectRequest::parse(raw)?;
        let (response, negotiated) = self.negotiate(&request);
        let bytes = response.to_bytes()?;
        self.commit(negotiated);
        Ok(bytes)
    }

    /// Compute the CNXN response and the resulting state without recording it.
    ///
    /// Pair with [`commit`](Self::commit) once the response has been delivered.
    /// A later CNXN renegotiates from the configured values.
    #[instrument(skip(self, request), fields(role = request.role().unwrap_or("?")))]
    pub fn negotiate(&self, request: &ConnectRequest) -> (Packet, Negotiated) {
        let version = self.protocol.version.min(request.version);
        let max_payload = self
            .protocol
            .max_payload
            .min(self.protocol.resolve_max_payload(request.max_payload));
        let features = negotiate_features(&request.features, &self.properties.features);
        let banner = banner::render_device_banner(&self.properties, features.as_slice());

        debug!(
            version,
            max_payload,
            requested = ?request.features,
            features = ?features,
            "Negotiated CNXN"
        );

        let response = Packet {
            command: A_CNXN,
            arg0: version,
            arg1: max_payload,
            payload: banner.clone().into_bytes(),
        };
        let negotiated = Negotiated {
            max_payload,
            features,
            banner,
        };
        (response, negotiated)
    }

    /// Record a negotiation outcome and mark the connection connected.
    pub fn commit(&mut self, negotiated: Negotiated) {
        if self.negotiated.is_some() {
            debug!("Peer renegotiated an established connection");
        }
        self.negotiated = Some(negotiated);
    }
}

/// Build a host-role CNXN packet requesting `features`.
///
/// A `max_payload` of zero is replaced by `protocol.default_max_payload`.
pub fn host_connect_packet<S: AsRef<str>>(
    version: u32,
    max_payload: u32,
    features: &[S],
    protocol: &ProtocolConfig,
) -> Packet {
    Packet::new(
        Command::Connect,
        version,
        protocol.resolve_max_payload(max_payload),
        banner::render_host_banner(features).into_bytes(),
    )
}

/// Encoded form of [`host_connect_packet`].
pub fn host_connect<S: AsRef<str>>(
    version: u32,
    max_payload: u32,
    features: &[S],
    protocol: &ProtocolConfig,
) -> Result<Vec<u8>> {
    host_connect_packet(version, max_payload, features, protocol).to_bytes()
}
