//! Tracked-message registry.
//!
//! Pure storage keyed by source message identity. Every method holds the
//! per-key lock only for the duration of the call and never across an await.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::oneshot;

use super::{EntryView, TrackedEntry};
use crate::event::{ChannelId, MessageId, MessageRef};

#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<DashMap<MessageId, TrackedEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry. Returns `false` if `source` is already tracked.
    pub fn create(&self, source: MessageId, entry: TrackedEntry) -> bool {
        match self.entries.entry(source) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn get(&self, source: MessageId) -> Option<EntryView> {
        self.entries.get(&source).map(|entry| entry.view())
    }

    pub fn contains(&self, source: MessageId) -> bool {
        self.entries.contains_key(&source)
    }

    /// The only way entries disappear.
    pub fn remove(&self, source: MessageId) -> Option<TrackedEntry> {
        self.entries.remove(&source).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sources(&self) -> Vec<MessageId> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    // ========================================================================
    // Narrow mutators (engine only)
    // ========================================================================

    pub(crate) fn set_code(
        &self,
        source: MessageId,
        code: String,
        variants: Vec<String>,
    ) -> Option<EntryView> {
        let mut entry = self.entries.get_mut(&source)?;
        entry.variants = if variants.is_empty() {
            vec![code.clone()]
        } else {
            variants
        };
        entry.code = code;
        Some(entry.view())
    }

    pub(crate) fn toggle_phase(&self, source: MessageId) -> Option<EntryView> {
        let mut entry = self.entries.get_mut(&source)?;
        entry.phase = entry.phase.toggled();
        Some(entry.view())
    }

    /// Record a freshly sent mirror. Returns `false` if the entry is gone,
    /// in which case the caller owns the orphaned mirror.
    pub(crate) fn attach_mirror(&self, source: MessageId, mirror: MessageRef) -> bool {
        match self.entries.get_mut(&source) {
            Some(mut entry) => {
                entry.mirrors.push(mirror);
                true
            }
            None => false,
        }
    }

    pub(crate) fn drop_mirror(&self, source: MessageId, mirror: MessageRef) {
        if let Some(mut entry) = self.entries.get_mut(&source) {
            entry.mirrors.retain(|m| *m != mirror);
        }
    }

    /// Remember a target whose mirror could not be sent yet.
    pub(crate) fn defer_target(&self, source: MessageId, channel: ChannelId) {
        if let Some(mut entry) = self.entries.get_mut(&source)
            && !entry.pending_targets.contains(&channel)
        {
            entry.pending_targets.push(channel);
        }
    }

    pub(crate) fn take_pending(&self, source: MessageId) -> Vec<ChannelId> {
        self.entries
            .get_mut(&source)
            .map(|mut entry| std::mem::take(&mut entry.pending_targets))
            .unwrap_or_default()
    }

    /// Hand the activity cancel senders to the entry. Returns `false` if the
    /// entry is gone or already armed; the senders are dropped in that case,
    /// which the receivers observe as cancellation.
    pub(crate) fn arm(
        &self,
        source: MessageId,
        animation_cancel_tx: Option<oneshot::Sender<()>>,
        expiry_cancel_tx: oneshot::Sender<()>,
    ) -> bool {
        match self.entries.get_mut(&source) {
            Some(mut entry) if !entry.is_armed() => {
                entry.animation_cancel_tx = animation_cancel_tx;
                entry.expiry_cancel_tx = Some(expiry_cancel_tx);
                true
            }
            _ => false,
        }
    }
}
