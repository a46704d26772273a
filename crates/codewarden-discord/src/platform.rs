//! [`Platform`] implementation over serenity's HTTP client.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serenity::all::{CreateMessage, EditMessage, Http, HttpError};

use codewarden::event::{ChannelId, Emoji, MessageRef};
use codewarden::outbound::{HistoryMessage, OutboundError, Platform};

use crate::convert::{author_of, message_ref, reaction_type, timestamp, to_channel, to_message};

/// Discord REST surface used by the engine.
///
/// Does no pacing of its own beyond serenity's built-in route ratelimiter.
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Platform for DiscordPlatform {
    async fn send_message(
        &self,
        channel: ChannelId,
        content: &str,
    ) -> Result<MessageRef, OutboundError> {
        let sent = to_channel(channel)
            .send_message(&self.http, CreateMessage::new().content(content))
            .await
            .map_err(classify)?;
        Ok(message_ref(sent.channel_id, sent.id))
    }

    async fn edit_message(&self, target: MessageRef, content: &str) -> Result<(), OutboundError> {
        to_channel(target.channel)
            .edit_message(
                &self.http,
                to_message(target),
                EditMessage::new().content(content),
            )
            .await
            .map(|_| ())
            .map_err(classify)
    }

    async fn delete_message(&self, target: MessageRef) -> Result<(), OutboundError> {
        to_channel(target.channel)
            .delete_message(&self.http, to_message(target))
            .await
            .map_err(classify)
    }

    async fn add_reaction(&self, target: MessageRef, emoji: &Emoji) -> Result<(), OutboundError> {
        to_channel(target.channel)
            .create_reaction(&self.http, to_message(target), reaction_type(emoji))
            .await
            .map_err(classify)
    }

    async fn remove_reaction(
        &self,
        target: MessageRef,
        emoji: &Emoji,
    ) -> Result<(), OutboundError> {
        to_channel(target.channel)
            .delete_reaction(&self.http, to_message(target), None, reaction_type(emoji))
            .await
            .map_err(classify)
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryMessage>, OutboundError> {
        let mut out = Vec::new();
        // Newest first; stop at the first message older than `since`.
        let mut stream = Box::pin(to_channel(channel).messages_iter(&self.http));
        while let Some(item) = stream.next().await {
            let msg = item.map_err(classify)?;
            let created_at = timestamp(msg.timestamp);
            if created_at < since {
                break;
            }
            out.push(HistoryMessage {
                reference: message_ref(msg.channel_id, msg.id),
                // Every bot, this one included, counts as non-human here.
                author: author_of(&msg.author, msg.webhook_id.is_some(), None, &HashSet::new()),
                created_at,
            });
        }
        Ok(out)
    }
}

/// Fold a serenity error into the three outbound failure kinds.
pub fn classify(err: serenity::Error) -> OutboundError {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) => {
            match resp.status_code.as_u16() {
                404 => OutboundError::NotFound,
                403 => OutboundError::Forbidden(resp.error.message),
                status => OutboundError::Transient(format!("HTTP {status}: {}", resp.error.message)),
            }
        }
        other => OutboundError::Transient(other.to_string()),
    }
}
