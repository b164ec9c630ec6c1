//! End-to-end CNXN exchange between a host and a device session over an
//! in-memory stream.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use adb_wire::config::{AdbConfig, DeviceProperties, ProtocolConfig, TransportConfig};
use adb_wire::core::codec::AdbCodec;
use adb_wire::core::command::Command;
use adb_wire::core::packet::Packet;
use adb_wire::error::ProtocolError;
use adb_wire::protocol::banner::Banner;
use adb_wire::protocol::handshake::{host_connect_packet, DeviceConnection};
use adb_wire::protocol::session::{host_handshake, DeviceSession};
use futures::SinkExt;
use std::time::Duration;
use tokio_util::codec::Framed;

fn device_config() -> AdbConfig {
    AdbConfig::default_with_overrides(|c| {
        c.device = DeviceProperties::default()
            .with_name("test_product")
            .with_model("Test Model")
            .with_device("test_device")
            .with_serialno("unit-serial")
            .with_features(["shell_v2", "cmd", "stat_v2"]);
    })
}

#[tokio::test]
async fn test_host_and_device_negotiate() {
    let config = device_config();
    let (host_io, device_io) = tokio::io::duplex(8192);

    let connection = DeviceConnection::from_config(&config).unwrap();
    let mut session = DeviceSession::new(device_io, connection, &config.transport);
    let device_task = tokio::spawn(async move {
        session.handshake().await.unwrap();
        session
    });

    let mut host = Framed::new(host_io, AdbCodec::default());
    let host_protocol = ProtocolConfig {
        max_payload: 8192,
        ..ProtocolConfig::default()
    };
    let reply = host_handshake(&mut host, &host_protocol, &["cmd", "foobar", "shell_v2"])
        .await
        .unwrap();

    assert_eq!(reply.version, config.protocol.version);
    assert_eq!(reply.max_payload, 4096);
    assert_eq!(reply.features, vec!["cmd", "shell_v2"]);
    assert_eq!(reply.role(), Some("device"));

    let banner = Banner::parse(&reply.banner).unwrap();
    assert_eq!(banner.serial, "unit-serial");
    assert_eq!(banner.property("ro.product.model"), Some("Test Model"));

    let session = device_task.await.unwrap();
    assert!(session.connection().is_connected());
    assert_eq!(session.connection().features(), ["cmd", "shell_v2"]);
}

#[tokio::test]
async fn test_device_skips_packets_before_cnxn() {
    let config = device_config();
    let (host_io, device_io) = tokio::io::duplex(8192);
    let connection = DeviceConnection::from_config(&config).unwrap();
    let mut session = DeviceSession::new(device_io, connection, &config.transport);

    let mut host = Framed::new(host_io, AdbCodec::default());
    // An AUTH token (outside the command table) and a stray OKAY come first.
    host.send(Packet {
        command: 0x4854_5541,
        arg0: 1,
        arg1: 0,
        payload: b"token".to_vec(),
    })
    .await
    .unwrap();
    host.send(Packet::new(Command::Okay, 1, 2, Vec::new()))
        .await
        .unwrap();

    let host_task = tokio::spawn(async move {
        let reply = host_handshake(&mut host, &ProtocolConfig::default(), &["cmd"])
            .await
            .unwrap();
        (host, reply)
    });

    let negotiated = session.handshake().await.unwrap().clone();
    assert_eq!(negotiated.features, vec!["cmd"]);

    let (mut host, reply) = host_task.await.unwrap();
    assert_eq!(reply.features, vec!["cmd"]);

    // After the handshake, packets flow through to the caller.
    host.send(Packet::new(Command::Open, 5, 0, b"shell:id\0".to_vec()))
        .await
        .unwrap();
    let open = session.next_packet().await.unwrap().unwrap();
    assert!(open.is(Command::Open));
    assert_eq!(open.payload, b"shell:id\0");
}

#[tokio::test]
async fn test_stream_closed_before_cnxn() {
    let config = device_config();
    let (host_io, device_io) = tokio::io::duplex(1024);
    let connection = DeviceConnection::from_config(&config).unwrap();
    let mut session = DeviceSession::new(device_io, connection, &config.transport);

    drop(host_io);
    let err = session.handshake().await.unwrap_err();
    assert!(matches!(err, ProtocolError::HandshakeError(_)));
    assert!(!session.connection().is_connected());
}

#[tokio::test]
async fn test_send_respects_negotiated_max_payload() {
    let config = device_config();
    let (host_io, device_io) = tokio::io::duplex(8192);
    let connection = DeviceConnection::from_config(&config).unwrap();
    let mut session = DeviceSession::new(device_io, connection, &config.transport);

    let mut host = Framed::new(host_io, AdbCodec::default());
    let host_protocol = ProtocolConfig {
        max_payload: 256,
        ..ProtocolConfig::default()
    };
    let host_task = tokio::spawn(async move {
        host_handshake(&mut host, &host_protocol, &["cmd"]).await.unwrap();
        host
    });

    session.handshake().await.unwrap();
    let _host = host_task.await.unwrap();
    assert_eq!(session.connection().max_payload(), 256);

    let err = session
        .send(Packet::new(Command::Write, 1, 1, vec![0u8; 257]))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::OversizedPacket(257)));
    session
        .send(Packet::new(Command::Write, 1, 1, vec![0u8; 256]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_oversized_frame_aborts_handshake() {
    let config = device_config();
    let transport = TransportConfig {
        max_frame_payload: 16,
    };
    let (host_io, device_io) = tokio::io::duplex(8192);
    let connection = DeviceConnection::from_config(&config).unwrap();
    let mut session = DeviceSession::new(device_io, connection, &transport);

    let mut host = Framed::new(host_io, AdbCodec::default());
    host.send(Packet::new(Command::Write, 0, 0, vec![0u8; 64]))
        .await
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), session.handshake())
        .await
        .expect("handshake should fail fast");
    assert!(matches!(result, Err(ProtocolError::OversizedPacket(64))));
}

#[tokio::test]
async fn test_failed_response_write_leaves_device_unconnected() {
    let config = device_config();
    let (host_io, device_io) = tokio::io::duplex(8192);
    let connection = DeviceConnection::from_config(&config).unwrap();
    let mut session = DeviceSession::new(device_io, connection, &config.transport);

    let mut host = Framed::new(host_io, AdbCodec::default());
    let request = host_connect_packet(
        config.protocol.version,
        4096,
        &["cmd"],
        &config.protocol,
    );
    host.send(request).await.unwrap();
    drop(host);

    let err = session.handshake().await.unwrap_err();
    assert!(matches!(err, ProtocolError::Io(_)));
    assert!(!session.connection().is_connected());
    assert!(session.connection().negotiated().is_none());
    assert!(session.connection().features().is_empty());
}
