//! System clock adapter.
//!
//! Implements [`ClockPort`]: monotonic uptime plus wall-clock queries.
//!
//! - **`target_os = "espidf"`** — uptime wraps `esp_timer_get_time()`;
//!   wall clock reads `gettimeofday` and is only trusted once SNTP has
//!   moved it past a plausibility floor.
//! - **all other targets** — uptime from `std::time::Instant`; the wall
//!   clock stays unsynced until a simulated epoch is injected.

use crate::app::ports::ClockPort;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU64, Ordering};

/// Anything earlier than 2020-01-01 is an unsynced RTC, not a date.
#[cfg(target_os = "espidf")]
const EPOCH_FLOOR: i64 = 1_577_836_800;

/// Simulation: epoch seconds corresponding to boot; `0` = never synced.
#[cfg(not(target_os = "espidf"))]
static SIM_EPOCH_AT_BOOT: AtomicU64 = AtomicU64::new(0);

/// Inject a wall-clock sync for host runs (epoch at the moment of boot).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_epoch_at_boot(epoch_secs: u64) {
    SIM_EPOCH_AT_BOOT.store(epoch_secs, Ordering::Relaxed);
}

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    boot: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            boot: std::time::Instant::now(),
        }
    }

    #[cfg(target_os = "espidf")]
    fn epoch_raw(&self) -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval { tv_sec: 0, tv_usec: 0 };
        // SAFETY: plain libc time query into a stack struct.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        if tv.tv_sec < EPOCH_FLOOR {
            return None;
        }
        Some(tv.tv_sec)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    #[cfg(target_os = "espidf")]
    fn uptime_secs(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_secs(&self) -> u64 {
        self.boot.elapsed().as_secs()
    }

    #[cfg(target_os = "espidf")]
    fn wall_clock_hm(&self) -> Option<(u8, u8)> {
        let secs = self.epoch_raw()? as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        // SAFETY: localtime_r writes into the zeroed stack struct.
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        if !(0..=23).contains(&tm.tm_hour) || !(0..=59).contains(&tm.tm_min) {
            return None;
        }
        Some((tm.tm_hour as u8, tm.tm_min as u8))
    }

    #[cfg(not(target_os = "espidf"))]
    fn wall_clock_hm(&self) -> Option<(u8, u8)> {
        let epoch = self.epoch_secs()?;
        let hour = (epoch / 3600) % 24;
        let minute = (epoch / 60) % 60;
        Some((hour as u8, minute as u8))
    }

    #[cfg(target_os = "espidf")]
    fn epoch_secs(&self) -> Option<u64> {
        self.epoch_raw().map(|s| s as u64)
    }

    #[cfg(not(target_os = "espidf"))]
    fn epoch_secs(&self) -> Option<u64> {
        let base = SIM_EPOCH_AT_BOOT.load(Ordering::Relaxed);
        if base == 0 {
            return None;
        }
        Some(base + self.uptime_secs())
    }
}
