//! Boot journal and runtime diagnostics.
//!
//! The journal keeps a boot counter and the reason the previous run ended
//! in the "boot" NVS namespace.  Controlled restarts leave a marker before
//! going down; a missing marker means the device died uncontrolled, and
//! the hardware reset reason tells us how.  The first heartbeat after boot
//! carries this story to the backend, which is how pump-room power problems
//! get noticed.

use log::error;

use crate::app::ports::StoragePort;

const BOOT_NS: &str = "boot";
const COUNT_KEY: &str = "count";
const EXIT_KEY: &str = "last_exit";

/// Journal of this device's boot history.
pub struct BootJournal {
    boot_count: u32,
    prior_exit: heapless::String<48>,
}

impl BootJournal {
    /// Read and advance the journal.  Consumes the exit marker so one
    /// controlled restart cannot explain two boots.
    pub fn open(nvs: &mut dyn StoragePort) -> Self {
        let mut buf = [0u8; 4];
        let boot_count = match nvs.read(BOOT_NS, COUNT_KEY, &mut buf) {
            Ok(4) => u32::from_le_bytes(buf).wrapping_add(1),
            _ => 1,
        };
        let _ = nvs.write(BOOT_NS, COUNT_KEY, &boot_count.to_le_bytes());

        let mut exit_buf = [0u8; 48];
        let prior_exit = match nvs.read(BOOT_NS, EXIT_KEY, &mut exit_buf) {
            Ok(len) => {
                let _ = nvs.delete(BOOT_NS, EXIT_KEY);
                let mut s = heapless::String::new();
                if let Ok(text) = core::str::from_utf8(&exit_buf[..len]) {
                    let _ = s.push_str(text);
                }
                s
            }
            Err(_) => {
                // No marker: the device went down without our consent.
                let mut s = heapless::String::new();
                let _ = s.push_str(reset_reason());
                s
            }
        };

        Self { boot_count, prior_exit }
    }

    pub fn boot_count(&self) -> u32 {
        self.boot_count
    }

    /// Why the previous run ended ("scheduled_maintenance", "watchdog",
    /// "power_on", ...).
    pub fn prior_exit(&self) -> &str {
        &self.prior_exit
    }

    /// Leave the exit marker.  Called immediately before a controlled
    /// restart; the reason string is truncated to the marker size.
    pub fn record_exit(nvs: &mut dyn StoragePort, reason: &str) {
        let bytes = reason.as_bytes();
        let len = bytes.len().min(48);
        let _ = nvs.write(BOOT_NS, EXIT_KEY, &bytes[..len]);
    }
}

/// Current free heap, reported in heartbeats.
#[cfg(target_os = "espidf")]
pub fn free_heap_bytes() -> u32 {
    unsafe { esp_idf_svc::sys::esp_get_free_heap_size() }
}

/// Host build: a fixed plausible figure so logs and payloads look real.
#[cfg(not(target_os = "espidf"))]
pub fn free_heap_bytes() -> u32 {
    307_200
}

/// Translate the hardware reset reason into a journal string.
#[cfg(target_os = "espidf")]
fn reset_reason() -> &'static str {
    use esp_idf_svc::sys::*;
    match unsafe { esp_reset_reason() } {
        esp_reset_reason_t_ESP_RST_POWERON => "power_on",
        esp_reset_reason_t_ESP_RST_SW => "software_reset",
        esp_reset_reason_t_ESP_RST_PANIC => "panic",
        esp_reset_reason_t_ESP_RST_TASK_WDT
        | esp_reset_reason_t_ESP_RST_INT_WDT
        | esp_reset_reason_t_ESP_RST_WDT => "watchdog",
        esp_reset_reason_t_ESP_RST_BROWNOUT => "brownout",
        _ => "unknown_reset",
    }
}

#[cfg(not(target_os = "espidf"))]
fn reset_reason() -> &'static str {
    "host_start"
}

/// Install a panic hook that stamps the journal before the reset.
///
/// Must be called once during init, after NVS is ready.  NVS is reopened
/// from scratch inside the hook; if that fails (panic before init) the
/// marker is skipped and the next boot reads the reset reason instead.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };

        error!("PANIC: {reason}");

        #[cfg(target_os = "espidf")]
        match crate::adapters::nvs::NvsStore::open_default() {
            Ok(mut nvs) => BootJournal::record_exit(&mut nvs, "panic"),
            Err(_) => error!("panic hook: NVS unavailable, marker skipped"),
        }
    }));
}
