//! Fuzz target: config blob loading
//!
//! Plants arbitrary bytes where the persisted config blob lives and runs
//! the real load path (postcard decode + structural validation) over it.
//! Verifies:
//! - No panics on any blob
//! - A blob that loads always satisfies the threshold ordering and yields
//!   finite derived geometry
//! - A loaded config survives a save/load round trip
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use aquaguard::adapters::nvs::NvsStore;
use aquaguard::app::ports::{ConfigPort, StoragePort};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut nvs = NvsStore::open_default().unwrap();
    nvs.write("aquaguard", "syscfg", data).unwrap();

    if let Ok(cfg) = nvs.load() {
        assert!(cfg.validate().is_ok(), "load must reject invalid configs");
        assert!(cfg.critical_level_percent < cfg.auto_stop_percent);
        assert!(cfg.auto_stop_percent < cfg.auto_start_percent);
        assert!(cfg.auto_start_percent < cfg.high_level_percent);
        assert!(!cfg.surface_area_cm2().is_nan());
        assert!(!cfg.full_volume_liters().is_nan());

        // Whatever decoded must also write back and read again cleanly.
        nvs.save(&cfg).unwrap();
        let again = nvs.load().unwrap();
        assert_eq!(again.queue_max_attempts, cfg.queue_max_attempts);
        assert!((again.tank_height_cm - cfg.tank_height_cm).abs() < 0.001);
    }
});
