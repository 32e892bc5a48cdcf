//! Fuzz target: `RequestSigner::sign`
//!
//! Generates arbitrary `(epoch, secret, body)` triples and verifies that
//! signing never panics, always yields 64 lowercase hex characters, always
//! echoes the epoch in the timestamp header, and is deterministic.
//!
//! cargo fuzz run fuzz_request_sign

#![no_main]

use aquaguard::cloud::auth::RequestSigner;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    // Partition fuzz bytes: first 8 = epoch, first half of the rest seeds
    // the secret, the remainder is the body.
    let (epoch_bytes, rest) = data.split_at(8);
    let epoch = u64::from_le_bytes(epoch_bytes.try_into().unwrap());
    let mid = rest.len() / 2;
    let secret = core::str::from_utf8(&rest[..mid]).unwrap_or("fuzz-secret");
    let body = &rest[mid..];

    let signer = RequestSigner::new("AG-FUZZ01", "fuzz-key", secret);
    let one = signer.sign(body, epoch);

    assert_eq!(one.signature.len(), 64);
    assert!(
        one.signature
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    );
    assert_eq!(one.timestamp.as_str().parse::<u64>().unwrap(), epoch);

    // Same inputs, same headers.
    let two = signer.sign(body, epoch);
    assert_eq!(one, two);
});
