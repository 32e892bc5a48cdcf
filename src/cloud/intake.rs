//! Command intake — polling, dedupe and acknowledgement.
//!
//! The backend queues commands per device; the device polls for them on its
//! own cadence, and only while the link is usable.  Delivery is at-least-
//! once on the backend side, so execution is made exactly-once here: a ring
//! of recently handled ids answers redeliveries with a `duplicate` ack and
//! never re-executes them.
//!
//! Ids are marked handled *before* the ack goes out.  If the ack is lost
//! the backend redelivers and gets `duplicate` back; the alternative order
//! would re-run a motor command on every lost ack.

use log::warn;

use crate::app::commands::Command;
use crate::app::ports::CloudPort;
use crate::cloud::messages::AckStatus;
use crate::config::SystemConfig;
use crate::error::CommandError;

/// Redelivery window.  The backend retries recent commands only, so a short
/// memory is enough; older ids falling out of the ring would be re-executed,
/// which the poll cadence makes practically unreachable.
const SEEN_IDS: usize = 8;

/// A deduplicated, parsed command awaiting execution.  The caller executes
/// it and must report the outcome through [`CommandIntake::ack`].
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub id: String,
    pub command: Command,
}

pub struct CommandIntake {
    poll_interval_secs: u64,
    last_poll_at: Option<u64>,
    seen: [Option<String>; SEEN_IDS],
    seen_next: usize,
}

impl CommandIntake {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            poll_interval_secs: u64::from(cfg.command_poll_secs),
            last_poll_at: None,
            seen: core::array::from_fn(|_| None),
            seen_next: 0,
        }
    }

    /// Whether a poll is due.  The first poll after boot is immediate; the
    /// caller additionally gates on connectivity.
    pub fn poll_due(&self, now: u64) -> bool {
        self.last_poll_at
            .is_none_or(|t| now.saturating_sub(t) >= self.poll_interval_secs)
    }

    /// Fetch pending commands, weed out duplicates and garbage, and return
    /// what is left for execution.  Transport failure yields an empty batch;
    /// the next poll happens a full interval later, not immediately.
    pub fn collect(&mut self, cloud: &mut impl CloudPort, now: u64) -> Vec<PendingCommand> {
        self.last_poll_at = Some(now);

        let envelopes = match cloud.fetch_commands() {
            Ok(list) => list,
            Err(err) => {
                warn!("intake: poll failed ({err})");
                return Vec::new();
            }
        };

        let mut pending = Vec::new();
        for envelope in envelopes {
            if envelope.id.is_empty() {
                // No id means no ack channel; drop it on the floor.
                warn!("intake: envelope without id (type '{}')", envelope.kind);
                continue;
            }
            if self.is_seen(&envelope.id) {
                let _ = cloud.ack(&envelope.id, AckStatus::Duplicate, "already_handled");
                continue;
            }
            match Command::parse(&envelope) {
                Ok(command) => pending.push(PendingCommand { id: envelope.id, command }),
                Err(CommandError::UnknownType) => {
                    warn!("intake: unknown command type '{}'", envelope.kind);
                    self.ack(cloud, &envelope.id, AckStatus::Unknown, "unknown_type");
                }
                Err(err) => {
                    warn!("intake: rejecting command {} ({err})", envelope.id);
                    self.ack(cloud, &envelope.id, AckStatus::Rejected, err.as_str());
                }
            }
        }
        pending
    }

    /// Report an outcome for `id` and retire it from redelivery.  The id is
    /// retired even when the ack transmission fails.
    pub fn ack(&mut self, cloud: &mut impl CloudPort, id: &str, status: AckStatus, detail: &str) {
        self.mark_seen(id);
        if let Err(err) = cloud.ack(id, status, detail) {
            warn!("intake: ack for {id} lost ({err}), backend will be told on redelivery");
        }
    }

    fn is_seen(&self, id: &str) -> bool {
        self.seen
            .iter()
            .any(|slot| slot.as_deref() == Some(id))
    }

    fn mark_seen(&mut self, id: &str) {
        if self.is_seen(id) {
            return;
        }
        self.seen[self.seen_next] = Some(id.to_owned());
        self.seen_next = (self.seen_next + 1) % SEEN_IDS;
    }
}
