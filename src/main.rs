//! AquaGuard firmware — main entry point.
//!
//! Hexagonal layout: the device loop in [`app::service`] is pure logic
//! behind port traits; everything ESP-IDF lives in the adapter ring
//! constructed here.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  HardwareAdapter        WifiLink          HttpCloud          │
//! │  (Sensor+Relay+Panel+   (LinkPort)        (CloudPort)        │
//! │   Indicator)                                                 │
//! │  NvsStore               SystemClock       LogEventSink       │
//! │  (Config+Storage)       (ClockPort)       (EventSink)        │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐    │
//! │  │             DeviceService (pure logic)               │    │
//! │  │  filter · motor · conn · queue · intake · maint      │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod app;
pub mod cloud;
pub mod config;
pub mod conn;
pub mod diagnostics;
mod error;
pub mod maintenance;
pub mod motor;
mod pins;

mod adapters;
mod drivers;
mod sensors;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::device_id;
use adapters::hardware::HardwareAdapter;
use adapters::http::HttpCloud;
use adapters::log_sink::LogEventSink;
use adapters::nvs::NvsStore;
use adapters::time::SystemClock;
use adapters::wifi::WifiLink;
use app::ports::{ConfigError, ConfigPort, LinkPort};
use app::service::DeviceService;
use config::SystemConfig;
use diagnostics::BootJournal;

/// Control loop period.  Sensor and telemetry cadences are multiples of
/// this; the panel debounce needs it well under 100ms.
const LOOP_PERIOD_MS: u32 = 250;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AquaGuard v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    diagnostics::install_panic_handler();

    // ── 2. Peripheral init, motor relay first and forced LOW ──
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // No pin state can be trusted now.  Halt with the relay driver
        // unconfigured and let the TWDT reset us for another try.
        log::error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let watchdog = drivers::watchdog::Watchdog::subscribe_current_task();

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let mut nvs = match NvsStore::open_default() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({e}), running without persistence");
            NvsStore::default()
        }
    };
    let mut config = match nvs.load() {
        Ok(cfg) => {
            info!("config loaded from NVS");
            cfg
        }
        Err(ConfigError::NotFound) => {
            info!("first boot, seeding default config");
            let cfg = SystemConfig::default();
            if let Err(e) = nvs.save(&cfg) {
                warn!("config seed failed ({e})");
            }
            cfg
        }
        Err(e) => {
            warn!("stored config unusable ({e}), using defaults");
            SystemConfig::default()
        }
    };

    // Identity: a configured id wins, otherwise derive from the MAC.
    if config.device_id.is_empty() {
        let _ = config.device_id.push_str(&device_id::derive());
    }

    // ── 4. Boot journal ───────────────────────────────────────
    let journal = BootJournal::open(&mut nvs);
    info!(
        "boot #{} as {} (prior exit: {})",
        journal.boot_count(),
        config.device_id,
        journal.prior_exit()
    );

    // ── 5. Adapter ring ───────────────────────────────────────
    let peripherals = esp_idf_svc::hal::peripherals::Peripherals::take()?;
    let sysloop = esp_idf_svc::eventloop::EspSystemEventLoop::take()?;
    let nvs_partition = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;

    let mut hw = HardwareAdapter::new();
    let mut wifi = WifiLink::new(peripherals.modem, sysloop, nvs_partition, &config)?;
    let mut cloud = HttpCloud::new(&config, config.device_id.as_str());
    let clock = SystemClock::new();
    let mut sink = LogEventSink::new();

    // Wall clock syncs in the background once the link is up; until then
    // wire records carry ts=0 and the maintenance scheduler holds.
    let _sntp = esp_idf_svc::sntp::EspSntp::new_default()?;

    // ── 6. Device service ─────────────────────────────────────
    let mut service = DeviceService::new(config);
    service.start(journal.boot_count(), journal.prior_exit(), &mut sink);

    info!("system ready, entering control loop");

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        let outcome = service.tick(&mut hw, &mut wifi, &mut cloud, &clock, &mut sink);

        if let Some(reason) = outcome.restart {
            warn!("maintenance: restarting ({reason})");
            BootJournal::record_exit(&mut nvs, reason);
            hw.all_off();
            wifi.disconnect();
            // SAFETY: clean restart; the relay was released by all_off.
            unsafe { esp_idf_svc::sys::esp_restart() };
        }

        watchdog.feed();
        esp_idf_hal::delay::FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
