//! Store-and-forward queue for outbound telemetry.
//!
//! Fixed sixteen slots, stack-friendly bookkeeping, FIFO by enqueue order.
//! When the backend is unreachable a message earns a per-message backoff
//! instead of blocking the queue head forever; when the queue is full the
//! oldest message is evicted so recent data always wins.  Heartbeats are
//! deliberately never routed through here — a heartbeat that arrives late
//! is worthless.

use log::{debug, warn};

use crate::app::ports::CloudPort;
use crate::cloud::messages::MessageKind;
use crate::config::SystemConfig;
use crate::conn::capped_backoff;

pub const QUEUE_SLOTS: usize = 16;

#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub kind: MessageKind,
    pub body: Vec<u8>,
    pub attempts: u8,
    pub next_attempt_at: u64,
    pub enqueued_at: u64,
    /// Monotonic enqueue counter; defines FIFO order and eviction age.
    seq: u32,
}

/// What one flush pass accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub sent: u8,
    pub failed: u8,
    pub dropped: u8,
}

pub struct OutboundQueue {
    slots: [Option<QueuedMessage>; QUEUE_SLOTS],
    seq: u32,
    backoff_base_secs: u64,
    backoff_cap_secs: u64,
    max_attempts: u8,
    // Lifetime counters, reported in heartbeats.
    evicted_total: u32,
    exhausted_total: u32,
}

impl OutboundQueue {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            seq: 0,
            backoff_base_secs: u64::from(cfg.queue_backoff_base_secs),
            backoff_cap_secs: u64::from(cfg.queue_backoff_cap_secs),
            max_attempts: cfg.queue_max_attempts,
            evicted_total: 0,
            exhausted_total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn evicted_total(&self) -> u32 {
        self.evicted_total
    }

    pub fn exhausted_total(&self) -> u32 {
        self.exhausted_total
    }

    /// Accept a message, evicting the oldest one when full.  Enqueueing
    /// never fails and never blocks; loss is the explicit overflow policy.
    pub fn enqueue(&mut self, kind: MessageKind, body: Vec<u8>, now: u64) {
        let slot = match self.free_slot() {
            Some(i) => i,
            None => {
                let i = self.oldest_slot();
                if let Some(old) = &self.slots[i] {
                    warn!(
                        "queue: full, evicting {} from {}s ago",
                        old.kind.as_str(),
                        now.saturating_sub(old.enqueued_at)
                    );
                }
                self.evicted_total = self.evicted_total.saturating_add(1);
                i
            }
        };

        self.slots[slot] = Some(QueuedMessage {
            kind,
            body,
            attempts: 0,
            next_attempt_at: now,
            enqueued_at: now,
            seq: self.seq,
        });
        self.seq = self.seq.wrapping_add(1);
    }

    /// Send every due message in FIFO order.  Stops at the first transport
    /// failure: if one send failed the rest will too, and the control loop
    /// must not stall behind a dead backend.
    pub fn flush(&mut self, cloud: &mut impl CloudPort, now: u64) -> FlushStats {
        let mut stats = FlushStats::default();

        while let Some(i) = self.next_due(now) {
            // Slot is occupied by construction of next_due.
            let Some(msg) = self.slots[i].as_mut() else { break };
            match cloud.send(msg.kind, &msg.body) {
                Ok(()) => {
                    debug!("queue: delivered {} (attempt {})", msg.kind.as_str(), msg.attempts + 1);
                    self.slots[i] = None;
                    stats.sent += 1;
                }
                Err(err) => {
                    let prior = msg.attempts;
                    msg.attempts = msg.attempts.saturating_add(1);
                    if msg.attempts >= self.max_attempts {
                        warn!(
                            "queue: dropping {} after {} attempts ({err})",
                            msg.kind.as_str(),
                            msg.attempts
                        );
                        self.slots[i] = None;
                        self.exhausted_total = self.exhausted_total.saturating_add(1);
                        stats.dropped += 1;
                    } else {
                        let delay = capped_backoff(
                            self.backoff_base_secs,
                            self.backoff_cap_secs,
                            u32::from(prior),
                        );
                        debug!(
                            "queue: {} failed ({err}), retry in {delay}s",
                            msg.kind.as_str()
                        );
                        msg.next_attempt_at = now + delay;
                        stats.failed += 1;
                    }
                    break;
                }
            }
        }

        stats
    }

    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Index of the oldest occupied slot.  Only called when full.
    fn oldest_slot(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|m| (i, m.seq)))
            .min_by_key(|&(_, seq)| seq)
            .map_or(0, |(i, _)| i)
    }

    /// Oldest due message, if any.
    fn next_due(&self, now: u64) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|m| (i, m)))
            .filter(|(_, m)| m.next_attempt_at <= now)
            .min_by_key(|&(_, m)| m.seq)
            .map(|(i, _)| i)
    }
}
