//! Fuzz target for frame decoding
//!
//! Arbitrary text must decode to an event or an error. The decoder should
//! NEVER panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(event) = fieldsync_proto::decode(raw) {
        let _ = event.kind();
    }
});
