//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`] — raw session control only.  Reconnection
//! policy (backoff, stability dwell, attempt counting) lives in the
//! domain's connectivity manager; this adapter just brings the session
//! up and down on request and reports liveness.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via
//!   `esp_idf_svc::wifi::EspWifi`, with a bounded busy-wait for
//!   association + DHCP.
//! - **all other targets**: in-memory session with injectable carrier
//!   loss and connect failures for host-side runs.

use log::{info, warn};

use crate::app::ports::LinkPort;
use crate::config::SystemConfig;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_hal::delay::FreeRtos;
#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::EspSystemEventLoop;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::EspDefaultNvsPartition;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    esp_wifi_set_ps, esp_wifi_sta_get_ap_info, wifi_ap_record_t, wifi_ps_type_t_WIFI_PS_NONE,
    ESP_OK,
};
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

/// Poll interval while waiting for association + DHCP.
#[cfg(target_os = "espidf")]
const CONNECT_POLL_MS: u32 = 250;

pub struct WifiLink {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    connect_timeout_secs: u16,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    session_up: bool,
    /// Simulation: carrier present (AP reachable).
    #[cfg(not(target_os = "espidf"))]
    sim_carrier: bool,
    /// Simulation: fail this many connect attempts before succeeding.
    #[cfg(not(target_os = "espidf"))]
    sim_fail_next: u8,
    #[cfg(not(target_os = "espidf"))]
    sim_connect_counter: u32,
}

impl WifiLink {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        cfg: &SystemConfig,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let wifi = EspWifi::new(modem, sysloop, Some(nvs))?;
        Ok(Self {
            ssid: cfg.wifi_ssid.clone(),
            password: cfg.wifi_password.clone(),
            connect_timeout_secs: cfg.connect_timeout_secs,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            ssid: cfg.wifi_ssid.clone(),
            password: cfg.wifi_password.clone(),
            connect_timeout_secs: cfg.connect_timeout_secs,
            session_up: false,
            sim_carrier: true,
            sim_fail_next: 0,
            sim_connect_counter: 0,
        }
    }

    /// Simulation: drop or restore the carrier (AP power-cycle).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_carrier(&mut self, present: bool) {
        self.sim_carrier = present;
        if !present {
            self.session_up = false;
        }
    }

    /// Simulation: make the next `n` connect attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next_connects(&mut self, n: u8) {
        self.sim_fail_next = n;
    }
}

// ── LinkPort: espidf ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl LinkPort for WifiLink {
    fn connect(&mut self) -> Result<(), CommsError> {
        if self.ssid.is_empty() {
            return Err(CommsError::NoCredentials);
        }

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };
        let client = ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| CommsError::NoCredentials)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| CommsError::NoCredentials)?,
            auth_method,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(|_| CommsError::ConnectFailed)?;

        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|_| CommsError::ConnectFailed)?;
        }
        info!("wifi: connecting to '{}'", self.ssid);
        self.wifi.connect().map_err(|_| CommsError::ConnectFailed)?;

        // Bounded wait for association + DHCP lease.
        let deadline_ms = u32::from(self.connect_timeout_secs) * 1000;
        let mut waited_ms = 0;
        while waited_ms < deadline_ms {
            if self.wifi.is_up().unwrap_or(false) {
                // Power save adds hundreds of ms to every round-trip.
                unsafe {
                    esp_wifi_set_ps(wifi_ps_type_t_WIFI_PS_NONE);
                }
                info!("wifi: up (rssi={:?})", self.rssi());
                return Ok(());
            }
            FreeRtos::delay_ms(CONNECT_POLL_MS);
            waited_ms += CONNECT_POLL_MS;
        }

        warn!("wifi: no link after {}s", self.connect_timeout_secs);
        let _ = self.wifi.disconnect();
        Err(CommsError::ConnectFailed)
    }

    fn disconnect(&mut self) {
        // Driver stays started so the next connect skips the cold path.
        let _ = self.wifi.disconnect();
        info!("wifi: session torn down");
    }

    fn is_up(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn rssi(&self) -> Option<i8> {
        let mut ap_info = wifi_ap_record_t::default();
        // SAFETY: fills a stack struct from the WiFi driver; read-only query.
        let rc = unsafe { esp_wifi_sta_get_ap_info(&mut ap_info) };
        (rc == ESP_OK).then_some(ap_info.rssi)
    }
}

// ── LinkPort: host simulation ─────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl LinkPort for WifiLink {
    fn connect(&mut self) -> Result<(), CommsError> {
        if self.ssid.is_empty() {
            return Err(CommsError::NoCredentials);
        }
        self.sim_connect_counter += 1;
        if self.sim_fail_next > 0 {
            self.sim_fail_next -= 1;
            warn!("wifi(sim): connect attempt {} failed", self.sim_connect_counter);
            return Err(CommsError::ConnectFailed);
        }
        if !self.sim_carrier {
            warn!("wifi(sim): no carrier");
            return Err(CommsError::ConnectFailed);
        }
        self.session_up = true;
        info!(
            "wifi(sim): connected to '{}' (attempt {})",
            self.ssid, self.sim_connect_counter
        );
        Ok(())
    }

    fn disconnect(&mut self) {
        self.session_up = false;
        info!("wifi(sim): session torn down");
    }

    fn is_up(&self) -> bool {
        self.session_up && self.sim_carrier
    }

    fn rssi(&self) -> Option<i8> {
        if !self.is_up() {
            return None;
        }
        // Oscillate between roughly -66 and -54 dBm across connects.
        let wobble = ((self.sim_connect_counter % 12) as i8) - 6;
        Some(-60_i8.saturating_add(wobble))
    }
}
