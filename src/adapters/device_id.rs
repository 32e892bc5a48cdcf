//! Device identity derived from the ESP32 factory MAC address.
//!
//! A unit introduces itself as `AG-XXYYZZ` (low three bytes of the 6-byte
//! eFuse MAC, uppercase hex).  The id is stable across reboots and firmware
//! updates, rides the `x-device-id` header on every signed request and is
//! stamped into each wire record.  A non-empty `device_id` in
//! [`SystemConfig`](crate::config::SystemConfig) overrides the derived one.

use core::fmt::Write as _;

/// `AG-` plus six hex digits, e.g. `AG-4F9E21`.
pub type DeviceId = heapless::String<16>;

/// Derive this unit's identity from the factory-burned MAC.
pub fn derive() -> DeviceId {
    format_id(factory_mac())
}

fn format_id(mac: [u8; 6]) -> DeviceId {
    let mut id = DeviceId::new();
    let _ = write!(id, "AG-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

#[cfg(target_os = "espidf")]
fn factory_mac() -> [u8; 6] {
    let mut mac = [0u8; 6];
    // SAFETY: out-pointer sized for the 6-byte base MAC.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: a fixed MAC so host logs and tests are reproducible.
#[cfg(not(target_os = "espidf"))]
fn factory_mac() -> [u8; 6] {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}
