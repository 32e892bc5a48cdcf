//! Connectivity supervisor.
//!
//! Wraps a [`LinkPort`](crate::app::ports::LinkPort) in a five-state machine
//! with capped exponential backoff.  The point of the `Stable` state is flap
//! damping: the attempt counter resets only after the link has stayed up for
//! a full dwell period, so a link that bounces every few seconds keeps
//! climbing the backoff curve instead of hammering the access point.
//!
//! Cloud I/O is permitted only while [`ConnectivityManager::is_online`]
//! holds.  The motor never consults this module.

use log::{info, warn};

use crate::app::ports::LinkPort;
use crate::config::SystemConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    /// Up for a full dwell period; backoff history cleared.
    Stable,
    Reconnecting,
}

impl LinkState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Stable => "stable",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl core::fmt::Display for LinkState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state edge, for the event stream and boot journal.
#[derive(Debug, Clone, Copy)]
pub struct LinkChange {
    pub from: LinkState,
    pub to: LinkState,
    pub at: u64,
}

/// `min(base * 2^attempts, cap)`, shift-safe for large attempt counts.
/// Shared with the outbound queue, which runs the same curve with its own
/// constants.
pub fn capped_backoff(base_secs: u64, cap_secs: u64, attempts: u32) -> u64 {
    let factor = 1u64 << attempts.min(16);
    cap_secs.min(base_secs.saturating_mul(factor))
}

pub struct ConnectivityManager {
    state: LinkState,
    state_since: u64,
    /// Failed connect attempts since the last `Stable` dwell.
    attempts: u32,
    next_attempt_at: u64,
    stable_dwell_secs: u64,
    backoff_base_secs: u64,
    backoff_cap_secs: u64,
}

impl ConnectivityManager {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            state: LinkState::Disconnected,
            state_since: 0,
            attempts: 0,
            next_attempt_at: 0,
            stable_dwell_secs: u64::from(cfg.stable_dwell_secs),
            backoff_base_secs: u64::from(cfg.link_backoff_base_secs),
            backoff_cap_secs: u64::from(cfg.link_backoff_cap_secs),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Cloud traffic (sends, command polls) is allowed only here.
    pub fn is_online(&self) -> bool {
        matches!(self.state, LinkState::Connected | LinkState::Stable)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Seconds until the next reconnect attempt, `0` when none is pending.
    pub fn next_attempt_in(&self, now: u64) -> u64 {
        if self.state == LinkState::Reconnecting {
            self.next_attempt_at.saturating_sub(now)
        } else {
            0
        }
    }

    /// One supervision step.  Never blocks longer than a single connect
    /// attempt; returns the state edge if one occurred.
    pub fn tick(&mut self, link: &mut impl LinkPort, now: u64) -> Option<LinkChange> {
        let before = self.state;
        match self.state {
            LinkState::Disconnected => {
                self.state = LinkState::Connecting;
                self.state_since = now;
                self.attempt(link, now);
            }
            // Normally resolved within the tick that entered it; finish the
            // attempt if a previous tick was interrupted.
            LinkState::Connecting => self.attempt(link, now),
            LinkState::Connected => {
                if !link.is_up() {
                    self.enter_reconnecting(link, now);
                } else if now.saturating_sub(self.state_since) >= self.stable_dwell_secs {
                    self.state = LinkState::Stable;
                    self.state_since = now;
                    // The only place the backoff history clears.
                    self.attempts = 0;
                    info!("link: stable ({}s dwell)", self.stable_dwell_secs);
                }
            }
            LinkState::Stable => {
                if !link.is_up() {
                    self.enter_reconnecting(link, now);
                }
            }
            LinkState::Reconnecting => {
                if now >= self.next_attempt_at {
                    self.attempt(link, now);
                }
            }
        }

        (self.state != before).then_some(LinkChange { from: before, to: self.state, at: now })
    }

    fn attempt(&mut self, link: &mut impl LinkPort, now: u64) {
        match link.connect() {
            Ok(()) => {
                info!("link: connected after {} failed attempt(s)", self.attempts);
                self.state = LinkState::Connected;
                self.state_since = now;
                // Attempts survive until Stable; an early drop resumes the
                // backoff curve where it left off.
            }
            Err(err) => {
                let delay =
                    capped_backoff(self.backoff_base_secs, self.backoff_cap_secs, self.attempts);
                self.attempts = self.attempts.saturating_add(1);
                warn!(
                    "link: connect failed ({err}), retry {} in {delay}s",
                    self.attempts
                );
                self.state = LinkState::Reconnecting;
                self.state_since = now;
                self.next_attempt_at = now + delay;
            }
        }
    }

    fn enter_reconnecting(&mut self, link: &mut impl LinkPort, now: u64) {
        link.disconnect();
        let delay = capped_backoff(self.backoff_base_secs, self.backoff_cap_secs, self.attempts);
        warn!(
            "link: dropped from {}, retry in {delay}s (attempt count {})",
            self.state.as_str(),
            self.attempts
        );
        self.state = LinkState::Reconnecting;
        self.state_since = now;
        self.next_attempt_at = now + delay;
    }
}
