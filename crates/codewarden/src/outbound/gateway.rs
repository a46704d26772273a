//! Paced outbound gateway with the shared error policy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::pacer::{OpKind, Pacer};
use super::{HistoryMessage, OutboundError, Platform};
use crate::config::PacingConfig;
use crate::event::{ChannelId, Emoji, MessageRef};

/// Outcome of a call against an existing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Done,
    /// The target was already gone; nothing left to do for it.
    Gone,
}

/// Cloneable handle shared by the engine, its tasks and the moderation rules.
#[derive(Clone)]
pub struct Gateway {
    platform: Arc<dyn Platform>,
    pacer: Arc<Pacer>,
}

impl Gateway {
    pub fn new(platform: Arc<dyn Platform>, pacing: &PacingConfig) -> Self {
        Self {
            platform,
            pacer: Arc::new(Pacer::new(pacing)),
        }
    }

    pub async fn send(&self, channel: ChannelId, content: &str) -> Result<MessageRef, OutboundError> {
        self.pacer.wait(OpKind::Send).await;
        let result = self.platform.send_message(channel, content).await;
        if let Err(ref e) = result {
            warn!(channel = %channel, error = %e, "Failed to send message");
        }
        result
    }

    pub async fn edit(&self, target: MessageRef, content: &str) -> Result<Delivery, OutboundError> {
        self.pacer.wait(OpKind::Edit).await;
        let result = self.platform.edit_message(target, content).await;
        settle("edit", target, result)
    }

    pub async fn delete(&self, target: MessageRef) -> Result<Delivery, OutboundError> {
        self.pacer.wait(OpKind::Delete).await;
        let result = self.platform.delete_message(target).await;
        settle("delete", target, result)
    }

    /// Delete issued by a bulk sweep; paced more conservatively.
    pub async fn sweep_delete(&self, target: MessageRef) -> Result<Delivery, OutboundError> {
        self.pacer.wait(OpKind::SweepDelete).await;
        let result = self.platform.delete_message(target).await;
        settle("sweep delete", target, result)
    }

    pub async fn add_reaction(
        &self,
        target: MessageRef,
        emoji: &Emoji,
    ) -> Result<Delivery, OutboundError> {
        self.pacer.wait(OpKind::Reaction).await;
        let result = self.platform.add_reaction(target, emoji).await;
        settle("add reaction", target, result)
    }

    pub async fn remove_reaction(
        &self,
        target: MessageRef,
        emoji: &Emoji,
    ) -> Result<Delivery, OutboundError> {
        self.pacer.wait(OpKind::Reaction).await;
        let result = self.platform.remove_reaction(target, emoji).await;
        settle("remove reaction", target, result)
    }

    pub async fn recent_messages(
        &self,
        channel: ChannelId,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryMessage>, OutboundError> {
        let result = self.platform.recent_messages(channel, since).await;
        if let Err(ref e) = result {
            warn!(channel = %channel, error = %e, "Failed to read channel history");
        }
        result
    }
}

/// Fold not-found into [`Delivery::Gone`] and log everything else.
fn settle(
    op: &'static str,
    target: MessageRef,
    result: Result<(), OutboundError>,
) -> Result<Delivery, OutboundError> {
    match result {
        Ok(()) => Ok(Delivery::Done),
        Err(OutboundError::NotFound) => {
            debug!(op, target = %target, "Target already gone");
            Ok(Delivery::Gone)
        }
        Err(e @ OutboundError::Forbidden(_)) => {
            warn!(op, target = %target, error = %e, "Missing permission, not retrying");
            Err(e)
        }
        Err(e @ OutboundError::Transient(_)) => {
            warn!(op, target = %target, error = %e, "Outbound call failed");
            Err(e)
        }
    }
}
