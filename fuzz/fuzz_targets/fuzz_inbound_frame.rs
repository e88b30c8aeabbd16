#![no_main]

use libfuzzer_sys::fuzz_target;
use scribble_client::protocol::InboundFrame;

fuzz_target!(|data: &[u8]| {
    // Classification must never panic, whatever arrives on the socket.
    if let Ok(InboundFrame::Control(event)) = InboundFrame::parse(data) {
        // Decoded control events must serialize back without panicking.
        let _ = serde_json::to_string(&event);
    }
});
