//! Request signing — per-device HMAC-SHA256 over outbound bodies.
//!
//! Every HTTP request carries four headers:
//!
//! | header        | value                                        |
//! |---------------|----------------------------------------------|
//! | `x-device-id` | device identity (`AG-XXYYZZ`)                |
//! | `x-api-key`   | provisioning API key                         |
//! | `x-timestamp` | epoch seconds at signing time, decimal       |
//! | `x-signature` | `HMAC-SHA256(secret, device_id‖body‖ts)` hex |
//!
//! The backend recomputes the tag and rejects stale timestamps, so replayed
//! requests die even if a body is captured in transit.  Crypto is the
//! `hmac-sha256` crate — pure Rust, no_std, identical on ESP-IDF and host
//! targets.

use core::fmt::Write as _;

pub const HEADER_DEVICE_ID: &str = "x-device-id";
pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_TIMESTAMP: &str = "x-timestamp";
pub const HEADER_SIGNATURE: &str = "x-signature";

/// Header values for one signed request.  The timestamp is part of the
/// signature, so the pair must be sent together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub timestamp: heapless::String<20>,
    pub signature: heapless::String<64>,
}

pub struct RequestSigner {
    device_id: String,
    api_key: String,
    secret: String,
}

impl RequestSigner {
    pub fn new(device_id: &str, api_key: &str, secret: &str) -> Self {
        Self {
            device_id: device_id.to_owned(),
            api_key: api_key.to_owned(),
            secret: secret.to_owned(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Sign `body` at `epoch_secs`.  The message is the byte concatenation
    /// `device_id ‖ body ‖ timestamp`, fed to the HMAC incrementally so no
    /// scratch buffer is needed.
    pub fn sign(&self, body: &[u8], epoch_secs: u64) -> SignedHeaders {
        let mut timestamp = heapless::String::<20>::new();
        // u64 decimal always fits in 20 bytes.
        let _ = write!(timestamp, "{epoch_secs}");

        let mut mac = hmac_sha256::HMAC::new(self.secret.as_bytes());
        mac.update(self.device_id.as_bytes());
        mac.update(body);
        mac.update(timestamp.as_bytes());
        let tag = mac.finalize();

        SignedHeaders {
            timestamp,
            signature: to_hex_lower(&tag),
        }
    }
}

fn to_hex_lower(tag: &[u8; 32]) -> heapless::String<64> {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = heapless::String::new();
    for byte in tag {
        let _ = out.push(LUT[usize::from(byte >> 4)] as char);
        let _ = out.push(LUT[usize::from(byte & 0x0f)] as char);
    }
    out
}
