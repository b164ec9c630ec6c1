#![no_main]

use libfuzzer_sys::fuzz_target;
use adb_wire::config::{DeviceProperties, ProtocolConfig};
use adb_wire::protocol::handshake::{ConnectRequest, DeviceConnection};

fuzz_target!(|data: &[u8]| {
    let _ = ConnectRequest::parse(data);

    let props = DeviceProperties::default().with_features(["shell_v2", "cmd"]);
    if let Ok(mut device) = DeviceConnection::new(&props, ProtocolConfig::default()) {
        if let Ok(response) = device.handle_connect(data) {
            // Whatever the host sent, the device reply is well-formed
            assert!(adb_wire::decode(&response).is_ok());
            assert!(device.max_payload() > 0);
        }
    }
});
