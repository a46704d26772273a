//! Code mirroring with a fixed lifetime.
//!
//! Each source message that carries a code gets a [`TrackedEntry`] in the
//! [`Registry`], one mirror per target channel, an animation loop and an
//! expiry timer. The lifecycle per entry:
//!
//! ```text
//!   absent ──on_create──▶ active ──on_delete──▶ deleted
//!                           │
//!                           └──── deadline ───▶ expired
//! ```
//!
//! Both activities look the entry up by source identity before every
//! outbound call, so removing the entry is what stops them. The oneshot
//! senders held in the entry only cut their sleeps short.

mod engine;
mod registry;
mod tasks;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::event::{ChannelId, MessageRef};
use crate::render::Phase;

pub use engine::MirrorEngine;
pub use registry::Registry;

/// Mirror state for one source message.
pub struct TrackedEntry {
    pub code: String,
    /// Spellings to render, original first. Never empty.
    pub variants: Vec<String>,
    pub phase: Phase,
    /// Fixed at creation, edits never move it.
    pub deadline: DateTime<Utc>,
    /// No status line and no animation.
    pub quiet: bool,
    pub mirrors: Vec<MessageRef>,
    /// Targets whose mirror send failed transiently; retried on each tick.
    pub pending_targets: Vec<ChannelId>,
    animation_cancel_tx: Option<oneshot::Sender<()>>,
    expiry_cancel_tx: Option<oneshot::Sender<()>>,
}

impl TrackedEntry {
    pub fn new(code: String, variants: Vec<String>, deadline: DateTime<Utc>, quiet: bool) -> Self {
        let variants = if variants.is_empty() {
            vec![code.clone()]
        } else {
            variants
        };
        Self {
            code,
            variants,
            phase: Phase::Pending,
            deadline,
            quiet,
            mirrors: Vec::new(),
            pending_targets: Vec::new(),
            animation_cancel_tx: None,
            expiry_cancel_tx: None,
        }
    }

    pub fn view(&self) -> EntryView {
        EntryView {
            code: self.code.clone(),
            variants: self.variants.clone(),
            phase: self.phase,
            deadline: self.deadline,
            quiet: self.quiet,
            mirrors: self.mirrors.clone(),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.expiry_cancel_tx.is_some()
    }

    /// Signal both activities to stop and hand back the mirrors to delete.
    pub fn release(mut self) -> Vec<MessageRef> {
        if let Some(tx) = self.animation_cancel_tx.take() {
            let _ = tx.send(());
        }
        if let Some(tx) = self.expiry_cancel_tx.take() {
            let _ = tx.send(());
        }
        std::mem::take(&mut self.mirrors)
    }
}

/// Point-in-time copy of an entry, safe to hold across awaits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub code: String,
    pub variants: Vec<String>,
    pub phase: Phase,
    pub deadline: DateTime<Utc>,
    pub quiet: bool,
    pub mirrors: Vec<MessageRef>,
}
