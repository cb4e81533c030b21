#![no_main]

//! Fuzz target for queue entry decoding.
//!
//! Queue entries come from a shared store any producer can write to, so
//! decoding must reject garbage without panicking. Entries that do decode
//! must survive a re-encode unchanged.

use libfuzzer_sys::fuzz_target;
use pacer_core::codec;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(job) = codec::decode(text) {
        let reencoded = codec::encode(&job);
        let again = codec::decode(&reencoded).expect("re-encoded entry must decode");
        assert_eq!(again, job);
    }
});
