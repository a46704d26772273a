//! Inbound event types.
//!
//! Platform adapters resolve everything platform-specific (bot flags, webhook
//! markers, own identity) once, at ingestion, into these types.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

// ============================================================================
// Identities
// ============================================================================

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

snowflake!(
    /// Platform-assigned channel identity.
    ChannelId
);
snowflake!(
    /// Platform-assigned message identity, unique across channels.
    MessageId
);
snowflake!(
    /// Platform-assigned user identity.
    UserId
);
snowflake!(
    /// Platform-assigned role identity.
    RoleId
);

/// A message addressed by channel and message identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel: ChannelId,
    pub message: MessageId,
}

impl MessageRef {
    pub fn new(channel: ChannelId, message: MessageId) -> Self {
        Self { channel, message }
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.message)
    }
}

// ============================================================================
// Authors
// ============================================================================

/// Who wrote a message, resolved once when the event is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorKind {
    /// A regular user.
    Human,
    /// The account this process runs as.
    Myself,
    /// A bot listed for automatic deletion.
    TargetBot,
    /// Any other bot account.
    Bot,
    /// A webhook post.
    Webhook,
}

impl AuthorKind {
    /// Resolve the author kind from raw platform flags.
    ///
    /// Own identity wins over everything else; webhook posts are never
    /// treated as bots even though platforms usually flag them as such.
    pub fn resolve(
        id: UserId,
        is_bot: bool,
        is_webhook: bool,
        me: Option<UserId>,
        target_bots: &HashSet<UserId>,
    ) -> Self {
        if me == Some(id) {
            AuthorKind::Myself
        } else if is_webhook {
            AuthorKind::Webhook
        } else if is_bot && target_bots.contains(&id) {
            AuthorKind::TargetBot
        } else if is_bot {
            AuthorKind::Bot
        } else {
            AuthorKind::Human
        }
    }

    pub fn is_human(self) -> bool {
        self == AuthorKind::Human
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub kind: AuthorKind,
}

impl Author {
    pub fn new(id: UserId, kind: AuthorKind) -> Self {
        Self { id, kind }
    }
}

// ============================================================================
// Messages & reactions
// ============================================================================

/// A chat message as observed on the inbound feed.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: MessageId,
    pub channel: ChannelId,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn reference(&self) -> MessageRef {
        MessageRef::new(self.channel, self.id)
    }

    /// Age of the message at `now`. Clock skew never yields a negative age.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Reaction glyph, either a plain unicode emoji or a server custom emoji.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Emoji {
    Unicode(String),
    Custom { id: u64, name: Option<String> },
}

impl Emoji {
    pub fn unicode(glyph: impl Into<String>) -> Self {
        Emoji::Unicode(glyph.into())
    }

    pub fn custom_id(&self) -> Option<u64> {
        match self {
            Emoji::Custom { id, .. } => Some(*id),
            Emoji::Unicode(_) => None,
        }
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Emoji::Unicode(glyph) => f.write_str(glyph),
            Emoji::Custom { id, name } => {
                write!(f, "<:{}:{}>", name.as_deref().unwrap_or("_"), id)
            }
        }
    }
}

/// A reaction added to a message, with the aggregate count after the add.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub message: MessageRef,
    pub message_author: Option<UserId>,
    pub reactor: Author,
    pub emoji: Emoji,
    pub count: u64,
}

/// Everything the dispatcher consumes, in delivery order.
#[derive(Debug, Clone)]
pub enum Event {
    MessageCreated(InboundMessage),
    MessageEdited(InboundMessage),
    MessageDeleted(MessageRef),
    ReactionAdded(ReactionEvent),
}
