#![no_main]

use libfuzzer_sys::fuzz_target;
use adb_wire::core::codec::AdbCodec;
use bytes::BytesMut;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Whole-buffer decode must never panic
    let _ = adb_wire::decode(data);

    // Stream decode must either yield frames, wait for more bytes, or error
    let mut codec = AdbCodec::new(64 * 1024);
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
});
