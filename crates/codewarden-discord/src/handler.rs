//! Serenity event handler: converts gateway events and queues them for the
//! dispatcher.

use std::collections::HashSet;
use std::sync::OnceLock;

use serenity::all::{
    ChannelId as DiscordChannelId, Context, EventHandler, GuildId, Interaction, Message,
    MessageId as DiscordMessageId, MessageUpdateEvent, Reaction, Ready,
};
use serenity::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use codewarden::config::Config;
use codewarden::event::{ChannelId, Event, ReactionEvent, UserId};
use codewarden::moderation::CleanupSweep;

use crate::commands;
use crate::convert::{author_of, edited_message, emoji_of, inbound_message, message_ref};

pub struct Handler {
    events: mpsc::Sender<Event>,
    cleanup: CleanupSweep,
    guild: Option<u64>,
    target_bots: HashSet<UserId>,
    threshold_channel: Option<ChannelId>,
    me: OnceLock<UserId>,
}

impl Handler {
    pub fn new(events: mpsc::Sender<Event>, cleanup: CleanupSweep, config: &Config) -> Self {
        Self {
            events,
            cleanup,
            guild: config.discord.guild_id,
            target_bots: config.auto_delete.target_bots.clone(),
            threshold_channel: config.reactions.threshold.channel,
            me: OnceLock::new(),
        }
    }

    fn me(&self) -> Option<UserId> {
        self.me.get().copied()
    }

    async fn forward(&self, event: Event) {
        if self.events.send(event).await.is_err() {
            debug!("Dispatcher gone, dropping event");
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, id = %ready.user.id, "Connected to Discord");
        let _ = self.me.set(UserId(ready.user.id.get()));
        commands::register(&ctx, self.guild).await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let inbound = inbound_message(&msg, self.me(), &self.target_bots);
        self.forward(Event::MessageCreated(inbound)).await;
    }

    async fn message_update(
        &self,
        _ctx: Context,
        _old_if_available: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        match edited_message(&event, self.me(), &self.target_bots) {
            Some(inbound) => self.forward(Event::MessageEdited(inbound)).await,
            None => debug!(message = %event.id, "Update without content, ignoring"),
        }
    }

    async fn message_delete(
        &self,
        _ctx: Context,
        channel_id: DiscordChannelId,
        deleted_message_id: DiscordMessageId,
        _guild_id: Option<GuildId>,
    ) {
        self.forward(Event::MessageDeleted(message_ref(channel_id, deleted_message_id)))
            .await;
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        // Only the threshold rule consumes reactions; skip the lookups elsewhere.
        if self.threshold_channel != Some(ChannelId(reaction.channel_id.get())) {
            return;
        }
        let Some(emoji) = emoji_of(&reaction.emoji) else {
            return;
        };

        let reactor = match reaction.user(&ctx.http).await {
            Ok(user) => author_of(&user, false, self.me(), &self.target_bots),
            Err(e) => {
                warn!(error = %e, "Failed to resolve reacting user");
                return;
            }
        };
        let message = match reaction.message(&ctx.http).await {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Reacted message unavailable");
                return;
            }
        };
        let count = message
            .reactions
            .iter()
            .find(|r| r.reaction_type == reaction.emoji)
            .map(|r| r.count)
            .unwrap_or(0);

        self.forward(Event::ReactionAdded(ReactionEvent {
            message: message_ref(reaction.channel_id, reaction.message_id),
            message_author: Some(UserId(message.author.id.get())),
            reactor,
            emoji,
            count,
        }))
        .await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        match command.data.name.as_str() {
            commands::CLEANUP => commands::handle_cleanup(&ctx, &command, &self.cleanup).await,
            other => warn!(command = other, "Unknown command"),
        }
    }
}
