//! Level filter — turns raw distance samples into a trusted level reading.
//!
//! Each sensor cycle takes a burst of raw samples, discards out-of-range
//! and timed-out ones, takes the **median** of the survivors (a single
//! reflection spike cannot move a median), then smooths with an
//! exponential moving average.  The EMA factor switches to a faster value
//! when the median steps further than the jump threshold, so genuine
//! fast-fill/fast-drain events are tracked instead of damped away.
//!
//! Health reporting:
//! * `Good` — enough valid samples; output freshly computed.
//! * `Degraded` — some valid samples but fewer than the minimum; the
//!   previous filtered value is held instead of trusting a thin cycle.
//! * `Failed` — no valid samples at all; the last known-good numbers are
//!   reported untouched.  A `Failed` reading never overwrites them.

use log::{debug, warn};
use serde::Serialize;

use crate::app::ports::SensorPort;
use crate::config::SystemConfig;

/// Scratch capacity for one sample burst (config caps `samples_per_cycle` at 8).
const MAX_SAMPLES: usize = 8;

/// Trustworthiness of a [`LevelReading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHealth {
    Good,
    Degraded,
    Failed,
}

impl SourceHealth {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        }
    }
}

impl core::fmt::Display for SourceHealth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filtered level measurement.
#[derive(Debug, Clone, Copy)]
pub struct LevelReading {
    /// Fill level, always clamped to 0..=100.
    pub percent: f32,
    /// Water volume derived from the tank cross-section.
    pub liters: f32,
    pub health: SourceHealth,
    /// Filtered sensor-to-surface distance behind the numbers above.
    pub distance_mm: f32,
    /// Uptime seconds when this cycle ran.
    pub sampled_at: u64,
}

impl LevelReading {
    /// Reading used before any successful cycle: empty tank, failed health.
    /// Can never satisfy a motor start gate.
    pub const fn unavailable() -> Self {
        Self {
            percent: 0.0,
            liters: 0.0,
            health: SourceHealth::Failed,
            distance_mm: 0.0,
            sampled_at: 0,
        }
    }
}

/// Median + adaptive-EMA filter over the ultrasonic distance capability.
pub struct LevelFilter {
    samples_per_cycle: usize,
    min_valid_samples: usize,
    min_mm: f32,
    max_mm: f32,
    alpha: f32,
    alpha_fast: f32,
    jump_mm: f32,
    tank_height_cm: f32,
    sensor_offset_cm: f32,
    surface_area_cm2: f32,
    filtered_mm: Option<f32>,
    last_good: Option<LevelReading>,
}

impl LevelFilter {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            samples_per_cycle: usize::from(cfg.samples_per_cycle).min(MAX_SAMPLES),
            min_valid_samples: usize::from(cfg.min_valid_samples),
            min_mm: f32::from(cfg.min_distance_mm),
            max_mm: f32::from(cfg.max_distance_mm),
            alpha: cfg.ema_alpha,
            alpha_fast: cfg.ema_alpha_fast,
            jump_mm: cfg.jump_threshold_mm,
            tank_height_cm: cfg.tank_height_cm,
            sensor_offset_cm: cfg.sensor_offset_cm,
            surface_area_cm2: cfg.surface_area_cm2(),
            filtered_mm: None,
            last_good: None,
        }
    }

    /// Run one sensor cycle.  Always returns a reading; the health field
    /// says how much to trust it.
    pub fn sample(&mut self, hw: &mut impl SensorPort, now: u64) -> LevelReading {
        let mut valid: heapless::Vec<f32, MAX_SAMPLES> = heapless::Vec::new();
        let mut timeouts: u8 = 0;
        let mut rejected: u8 = 0;

        for _ in 0..self.samples_per_cycle {
            match hw.read_distance() {
                None => timeouts += 1,
                Some(raw) => {
                    let mm = f32::from(raw);
                    if (self.min_mm..=self.max_mm).contains(&mm) {
                        let _ = valid.push(mm);
                    } else {
                        rejected += 1;
                    }
                }
            }
        }

        if valid.is_empty() {
            warn!(
                "level cycle failed: {timeouts} timeouts, {rejected} out of range, holding last good"
            );
            return self.hold(SourceHealth::Failed, now);
        }
        if valid.len() < self.min_valid_samples {
            debug!(
                "level cycle thin: {}/{} valid, holding previous value",
                valid.len(),
                self.samples_per_cycle
            );
            return self.hold(SourceHealth::Degraded, now);
        }

        let median = median_mm(&mut valid);
        let filtered = match self.filtered_mm {
            None => median,
            Some(prev) => {
                let a = if (median - prev).abs() > self.jump_mm {
                    self.alpha_fast
                } else {
                    self.alpha
                };
                a * median + (1.0 - a) * prev
            }
        };
        self.filtered_mm = Some(filtered);

        let reading = self.reading_from_distance(filtered, now);
        self.last_good = Some(reading);
        reading
    }

    /// Most recent trusted reading, if any cycle ever succeeded.
    pub fn last_good(&self) -> Option<LevelReading> {
        self.last_good
    }

    fn hold(&self, health: SourceHealth, now: u64) -> LevelReading {
        let base = self.last_good.unwrap_or(LevelReading::unavailable());
        LevelReading {
            health,
            sampled_at: now,
            ..base
        }
    }

    fn reading_from_distance(&self, mm: f32, now: u64) -> LevelReading {
        let distance_cm = mm / 10.0 - self.sensor_offset_cm;
        let water_cm = (self.tank_height_cm - distance_cm).clamp(0.0, self.tank_height_cm);
        let percent = (water_cm / self.tank_height_cm * 100.0).clamp(0.0, 100.0);
        let liters = self.surface_area_cm2 * water_cm / 1000.0;
        LevelReading {
            percent,
            liters,
            health: SourceHealth::Good,
            distance_mm: mm,
            sampled_at: now,
        }
    }
}

/// Median of a non-empty slice (midpoint average for even counts).
fn median_mm(xs: &mut [f32]) -> f32 {
    xs.sort_unstable_by(f32::total_cmp);
    let n = xs.len();
    if n % 2 == 1 {
        xs[n / 2]
    } else {
        (xs[n / 2 - 1] + xs[n / 2]) / 2.0
    }
}
