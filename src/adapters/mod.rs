//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements       | Connects to                   |
//! |-------------|------------------|-------------------------------|
//! | `hardware`  | SensorPort       | Ultrasonic + float switch     |
//! |             | RelayPort        | Motor relay GPIO              |
//! |             | PanelPort        | Mode / manual switches        |
//! |             | IndicatorPort    | LEDs + buzzer                 |
//! | `http`      | CloudPort        | Signed HTTPS to the backend   |
//! | `log_sink`  | EventSink        | Serial log output             |
//! | `nvs`       | ConfigPort       | NVS / in-memory store         |
//! |             | StoragePort      |                               |
//! | `time`      | ClockPort        | ESP32 timer + system clock    |
//! | `wifi`      | LinkPort         | ESP-IDF WiFi STA              |

pub mod device_id;
pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
