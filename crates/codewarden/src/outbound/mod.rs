//! Outbound side effects.
//!
//! [`Platform`] is the raw chat-platform surface implemented by adapters.
//! [`Gateway`] wraps it with pacing and the error policy every caller relies
//! on: not-found is a normal outcome, forbidden and transient failures are
//! logged and handed back so callers can carry on with other targets.

mod gateway;
mod pacer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::event::{Author, ChannelId, Emoji, MessageRef};

pub use gateway::{Delivery, Gateway};
pub use pacer::{OpKind, Pacer};

/// Failure kinds every platform error is folded into.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OutboundError {
    /// Target message or channel no longer exists.
    #[error("target not found")]
    NotFound,

    /// Missing permission for this call.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Upstream failing for now; a later attempt may succeed.
    #[error("transient failure: {0}")]
    Transient(String),
}

/// A message returned by a history scan.
#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub reference: MessageRef,
    pub author: Author,
    pub created_at: DateTime<Utc>,
}

/// Raw platform calls. Implementations classify their errors into
/// [`OutboundError`] and do no pacing of their own.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn send_message(
        &self,
        channel: ChannelId,
        content: &str,
    ) -> Result<MessageRef, OutboundError>;

    async fn edit_message(&self, target: MessageRef, content: &str) -> Result<(), OutboundError>;

    async fn delete_message(&self, target: MessageRef) -> Result<(), OutboundError>;

    async fn add_reaction(&self, target: MessageRef, emoji: &Emoji) -> Result<(), OutboundError>;

    /// Remove a reaction previously added by this account.
    async fn remove_reaction(&self, target: MessageRef, emoji: &Emoji)
    -> Result<(), OutboundError>;

    /// Messages in `channel` created at or after `since`, in any order.
    async fn recent_messages(
        &self,
        channel: ChannelId,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryMessage>, OutboundError>;
}
