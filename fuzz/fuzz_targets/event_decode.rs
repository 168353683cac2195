//! Fuzz target for realtime frame decoding
//!
//! Arbitrary text must never panic the decoders. Anything that decodes must
//! survive a re-encode and decode to the same value.

#![no_main]

use kennel_proto::{ClientIntent, ServerEvent};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(event) = ServerEvent::decode(text) {
        let encoded = event.encode().expect("decoded event re-encodes");
        assert_eq!(ServerEvent::decode(&encoded).ok(), Some(event));
    }

    if let Ok(intent) = ClientIntent::decode(text) {
        let encoded = intent.encode().expect("decoded intent re-encodes");
        assert_eq!(ClientIntent::decode(&encoded).ok(), Some(intent));
    }
});
