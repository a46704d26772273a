//! Per-operation call spacing.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::PacingConfig;

/// Outbound operation classes, each paced independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Send,
    Edit,
    Delete,
    Reaction,
    /// Deletes issued by bulk sweeps.
    SweepDelete,
}

/// Hands out time slots so that consecutive calls of one kind are at least
/// `spacing` apart. Safe to share between any number of tasks.
#[derive(Debug)]
pub struct Pacer {
    send: Duration,
    edit: Duration,
    delete: Duration,
    reaction: Duration,
    sweep_delete: Duration,
    next_slot: DashMap<OpKind, Instant>,
}

impl Pacer {
    pub fn new(config: &PacingConfig) -> Self {
        Self {
            send: Duration::from_millis(config.send_ms),
            edit: Duration::from_millis(config.edit_ms),
            delete: Duration::from_millis(config.delete_ms),
            reaction: Duration::from_millis(config.reaction_ms),
            sweep_delete: Duration::from_millis(config.sweep_delete_ms),
            next_slot: DashMap::new(),
        }
    }

    pub fn spacing(&self, kind: OpKind) -> Duration {
        match kind {
            OpKind::Send => self.send,
            OpKind::Edit => self.edit,
            OpKind::Delete => self.delete,
            OpKind::Reaction => self.reaction,
            OpKind::SweepDelete => self.sweep_delete,
        }
    }

    /// Wait until the next free slot for `kind`.
    pub async fn wait(&self, kind: OpKind) {
        let spacing = self.spacing(kind);
        if spacing.is_zero() {
            return;
        }

        let slot = {
            let now = Instant::now();
            let mut next = self.next_slot.entry(kind).or_insert(now);
            let slot = (*next).max(now);
            *next = slot + spacing;
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}
