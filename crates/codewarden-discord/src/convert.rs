//! Conversions between serenity models and codewarden events.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serenity::all::{
    ChannelId as DiscordChannelId, EmojiId, Message, MessageId as DiscordMessageId,
    MessageUpdateEvent, ReactionType, Timestamp, User,
};

use codewarden::event::{
    Author, AuthorKind, ChannelId, Emoji, InboundMessage, MessageId, MessageRef, UserId,
};

pub fn to_channel(channel: ChannelId) -> DiscordChannelId {
    DiscordChannelId::new(channel.get())
}

pub fn to_message(target: MessageRef) -> DiscordMessageId {
    DiscordMessageId::new(target.message.get())
}

pub fn message_ref(channel: DiscordChannelId, message: DiscordMessageId) -> MessageRef {
    MessageRef::new(ChannelId(channel.get()), MessageId(message.get()))
}

pub fn timestamp(ts: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}

pub fn author_of(
    user: &User,
    is_webhook: bool,
    me: Option<UserId>,
    target_bots: &HashSet<UserId>,
) -> Author {
    let id = UserId(user.id.get());
    Author::new(
        id,
        AuthorKind::resolve(id, user.bot, is_webhook, me, target_bots),
    )
}

pub fn inbound_message(
    msg: &Message,
    me: Option<UserId>,
    target_bots: &HashSet<UserId>,
) -> InboundMessage {
    InboundMessage {
        id: MessageId(msg.id.get()),
        channel: ChannelId(msg.channel_id.get()),
        author: author_of(&msg.author, msg.webhook_id.is_some(), me, target_bots),
        content: msg.content.clone(),
        created_at: timestamp(msg.timestamp),
    }
}

/// Build the edited view of a message from a partial update.
///
/// Returns `None` for updates that carry no new text (embed unfurls and
/// the like).
pub fn edited_message(
    event: &MessageUpdateEvent,
    me: Option<UserId>,
    target_bots: &HashSet<UserId>,
) -> Option<InboundMessage> {
    let content = event.content.clone()?;
    let author = event.author.as_ref()?;
    let is_webhook = matches!(event.webhook_id, Some(Some(_)));
    Some(InboundMessage {
        id: MessageId(event.id.get()),
        channel: ChannelId(event.channel_id.get()),
        author: author_of(author, is_webhook, me, target_bots),
        content,
        // Snowflakes encode creation time; the update's own timestamp is
        // not always present.
        created_at: timestamp(event.id.created_at()),
    })
}

pub fn reaction_type(emoji: &Emoji) -> ReactionType {
    match emoji {
        Emoji::Unicode(glyph) => ReactionType::Unicode(glyph.clone()),
        Emoji::Custom { id, name } => ReactionType::Custom {
            animated: false,
            id: EmojiId::new(*id),
            name: name.clone(),
        },
    }
}

pub fn emoji_of(reaction: &ReactionType) -> Option<Emoji> {
    match reaction {
        ReactionType::Unicode(glyph) => Some(Emoji::Unicode(glyph.clone())),
        ReactionType::Custom { id, name, .. } => Some(Emoji::Custom {
            id: id.get(),
            name: name.clone(),
        }),
        _ => None,
    }
}
