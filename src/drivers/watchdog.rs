//! Task watchdog integration.
//!
//! The control loop subscribes the main task to the ESP-IDF task
//! watchdog (TWDT) and feeds it once per tick.  A wedged loop (blocked
//! HTTP call, runaway busy-wait) stops the feeds and the TWDT panics the
//! chip, which reboots into a safe state with the relay released.
//!
//! On host builds this is a no-op shell so the service loop code stays
//! identical across targets.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

/// Feed deadline.  Must outlast the longest legitimate blocking window
/// in one tick: a WiFi connect wait (10s) or a queue drain of several
/// slow HTTP round-trips.  This catches a wedged loop, not slow I/O.
const WATCHDOG_TIMEOUT_MS: u32 = 60_000;

pub struct Watchdog {
    subscribed: bool,
}

impl Watchdog {
    /// Reconfigure the TWDT and subscribe the calling task.
    #[cfg(target_os = "espidf")]
    pub fn subscribe_current_task() -> Self {
        // SAFETY: TWDT reconfigure/add from the main task before the
        // control loop starts; no other task touches the TWDT config.
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: WATCHDOG_TIMEOUT_MS,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            esp_task_wdt_reconfigure(&cfg);
            esp_task_wdt_add(core::ptr::null_mut());
        }
        info!("watchdog: main task subscribed ({WATCHDOG_TIMEOUT_MS}ms)");
        Self { subscribed: true }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn subscribe_current_task() -> Self {
        info!("watchdog(sim): subscribe skipped ({WATCHDOG_TIMEOUT_MS}ms)");
        Self { subscribed: false }
    }

    /// Call once per control tick.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the calling task's TWDT entry only.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
