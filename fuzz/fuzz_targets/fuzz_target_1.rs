#![no_main]

use libfuzzer_sys::fuzz_target;
use wsclient_core::frame::{decode_next, Decoded};

// The decoder is the crate's byte-exact-conformance surface: a pure
// function over whatever bytes happen to be on the wire, no socket
// required. Feed it arbitrary input a byte at a time as well as whole,
// to exercise the NeedMore/Err paths around the length-prefix boundary
// as well as a one-shot full buffer.
fuzz_target!(|data: &[u8]| {
    match decode_next(data, usize::MAX) {
        Decoded::NeedMore | Decoded::Err(_) => {}
        Decoded::Frame { consumed, .. } => assert!(consumed <= data.len()),
    }

    for split in 0..=data.len() {
        let (head, _) = data.split_at(split);
        // Must never panic regardless of where the buffer is cut.
        let _ = decode_next(head, usize::MAX);
    }
});
