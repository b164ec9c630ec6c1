//! Drives the CNXN exchange over a framed byte stream.
//!
//! Packets read here have passed full magic and checksum verification in
//! [`AdbCodec`]. Anything other than CNXN that arrives before the handshake
//! (an AUTH packet from a host that expects authentication, for instance) is
//! logged and dropped. Timeouts are left to the caller; wrap the futures in
//! `tokio::time::timeout` as needed.

use crate::config::{ProtocolConfig, TransportConfig};
use crate::core::codec::AdbCodec;
use crate::core::command::{command_name, Command};
use crate::core::packet::Packet;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::handshake::{host_connect_packet, ConnectRequest, DeviceConnection, Negotiated};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument};

/// Read frames until a CNXN arrives, skipping everything else.
async fn next_connect<T>(framed: &mut Framed<T, AdbCodec>) -> Result<Packet>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let packet = match framed.next().await {
            Some(packet) => packet?,
            None => {
                return Err(ProtocolError::HandshakeError(
                    constants::ERR_STREAM_CLOSED_BEFORE_CNXN.into(),
                ))
            }
        };

        if packet.is(Command::Connect) {
            return Ok(packet);
        }
        debug!(command = %command_name(packet.command), "Ignoring packet before CNXN");
    }
}

/// Device end of a transport stream.
#[derive(Debug)]
pub struct DeviceSession<T> {
    framed: Framed<T, AdbCodec>,
    connection: DeviceConnection,
}

impl<T> DeviceSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: T, connection: DeviceConnection, transport: &TransportConfig) -> Self {
        Self {
            framed: Framed::new(io, AdbCodec::new(transport.max_frame_payload)),
            connection,
        }
    }

    /// Wait for the host's CNXN, negotiate, and send the device CNXN.
    ///
    /// The connection is only marked connected once the response is written.
    #[instrument(skip(self), fields(serial = self.connection.serial().unwrap_or("")))]
    pub async fn handshake(&mut self) -> Result<&Negotiated> {
        let packet = next_connect(&mut self.framed).await?;
        let (response, negotiated) = self
            .connection
            .negotiate(&ConnectRequest::from_packet(&packet));
        self.framed.send(response).await?;
        self.connection.commit(negotiated);

        info!(max_payload = self.connection.max_payload(), "Device connected");
        self.connection
            .negotiated()
            .ok_or_else(|| ProtocolError::HandshakeError("negotiation state missing".into()))
    }

    pub fn connection(&self) -> &DeviceConnection {
        &self.connection
    }

    /// Next verified packet from the host, or `None` once the stream ends.
    pub async fn next_packet(&mut self) -> Result<Option<Packet>> {
        self.framed.next().await.transpose()
    }

    /// Send a packet, refusing payloads beyond the effective max payload.
    pub async fn send(&mut self, packet: Packet) -> Result<()> {
        if packet.payload.len() > self.connection.max_payload() as usize {
            return Err(ProtocolError::OversizedPacket(packet.payload.len()));
        }
        self.framed.send(packet).await
    }

    pub fn into_parts(self) -> (T, DeviceConnection) {
        (self.framed.into_inner(), self.connection)
    }
}

/// Host end of the handshake: send a CNXN requesting `features` and wait for
/// the device's answer.
#[instrument(skip(framed, protocol, features))]
pub async fn host_handshake<T, S>(
    framed: &mut Framed<T, AdbCodec>,
    protocol: &ProtocolConfig,
    features: &[S],
) -> Result<ConnectRequest>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: AsRef<str>,
{
    let request = host_connect_packet(protocol.version, protocol.max_payload, features, protocol);
    framed.send(request).await?;

    let reply = next_connect(framed).await?;
    let device = ConnectRequest::from_packet(&reply);
    debug!(banner = %device.banner, "Device answered CNXN");
    Ok(device)
}
