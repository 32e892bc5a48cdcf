//! Fuzz target: `parse_command_feed`
//!
//! Drives arbitrary bytes through the pending-command feed parser and
//! verifies:
//! - No panics on any input
//! - An accepted feed agrees with a generic JSON parse of the same bytes
//!   (same element count, same ids)
//! - Parsing is deterministic
//!
//! cargo fuzz run fuzz_command_feed

#![no_main]

use aquaguard::cloud::messages::parse_command_feed;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let first = parse_command_feed(data);

    if let Ok(cmds) = &first {
        // Anything the lenient parser accepted must also be a plain JSON
        // array of the same length, envelope for envelope.
        if data.is_empty() {
            assert!(cmds.is_empty(), "empty body must mean no work");
        } else {
            let generic: serde_json::Value =
                serde_json::from_slice(data).expect("accepted feed must be valid JSON");
            let array = generic.as_array().expect("accepted feed must be an array");
            assert_eq!(array.len(), cmds.len());
            for (cmd, raw) in cmds.iter().zip(array) {
                assert_eq!(raw["id"], cmd.id.as_str());
                assert_eq!(raw["type"], cmd.kind.as_str());
            }
        }
    }

    // Same bytes, same verdict.
    let second = parse_command_feed(data);
    match (&first, &second) {
        (Ok(a), Ok(b)) => assert_eq!(a.len(), b.len()),
        (Err(_), Err(_)) => {}
        _ => panic!("feed parsing must be deterministic"),
    }
});
