//! Maintenance scheduler — the only path to a deliberate restart.
//!
//! A daily restart at a configured `hh:mm` keeps long-running units from
//! accumulating heap fragmentation and driver wedges.  The schedule is
//! wall-clock based and therefore entirely dependent on a synced clock: no
//! sync, no restart, by design.  Firing is latched to the scheduled minute
//! so one match cannot restart the device twice.
//!
//! Every other restart request (cloud `restart` command) is routed through
//! the same arming path, so there is exactly one place that decides when the
//! device goes down, and it always goes down gracefully: motor stopped,
//! queue given a grace period to drain, then the reset.

use log::{info, warn};

use crate::config::SystemConfig;

/// Scheduled fires are suppressed this early in the boot.  A device that
/// boots back inside its own maintenance minute must not loop.
const MIN_UPTIME_SECS: u64 = 90;

#[derive(Debug, Clone, Copy)]
struct PendingRestart {
    reason: &'static str,
    requested_at: u64,
}

pub struct MaintenanceScheduler {
    enabled: bool,
    hour: u8,
    minute: u8,
    grace_secs: u64,
    /// Set while the wall clock sits inside the scheduled minute.
    minute_latch: bool,
    pending: Option<PendingRestart>,
}

impl MaintenanceScheduler {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            enabled: cfg.maintenance_restart_enabled,
            hour: cfg.maintenance_restart_hour,
            minute: cfg.maintenance_restart_minute,
            grace_secs: u64::from(cfg.maintenance_grace_secs),
            minute_latch: false,
            pending: None,
        }
    }

    /// Evaluate the daily schedule against the wall clock.  Returns `true`
    /// when this call armed the restart.  `None` for the clock (no NTP sync
    /// yet, or sync lost) means the schedule silently does not fire.
    pub fn tick(&mut self, wall_clock_hm: Option<(u8, u8)>, now: u64) -> bool {
        let Some((hour, minute)) = wall_clock_hm else {
            return false;
        };
        let in_window = hour == self.hour && minute == self.minute;
        if !in_window {
            self.minute_latch = false;
            return false;
        }
        if !self.enabled || self.minute_latch {
            return false;
        }
        self.minute_latch = true;
        if now < MIN_UPTIME_SECS {
            warn!("maintenance: inside scheduled minute {}s after boot, skipping", now);
            return false;
        }
        self.request_restart("scheduled_maintenance", now)
    }

    /// Arm a controlled restart.  Idempotent; the first reason wins.
    pub fn request_restart(&mut self, reason: &'static str, now: u64) -> bool {
        if let Some(pending) = self.pending {
            info!("maintenance: restart already armed ({})", pending.reason);
            return false;
        }
        info!("maintenance: restart armed ({reason}), {}s grace", self.grace_secs);
        self.pending = Some(PendingRestart { reason, requested_at: now });
        true
    }

    /// Reason of the armed restart, if any.  Set from arming until the
    /// device actually goes down.
    pub fn restart_pending(&self) -> Option<&'static str> {
        self.pending.map(|p| p.reason)
    }

    /// The restart reason once the grace period has fully elapsed.  The
    /// caller performs the reset; this module never touches the hardware.
    pub fn restart_due(&self, now: u64) -> Option<&'static str> {
        self.pending
            .filter(|p| now.saturating_sub(p.requested_at) >= self.grace_secs)
            .map(|p| p.reason)
    }
}
