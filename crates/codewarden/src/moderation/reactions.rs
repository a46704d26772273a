//! Reaction-driven behaviors: a cycling countdown glyph on fresh posts and
//! deletion once a custom emoji crosses a vote threshold.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{CountdownReactionConfig, ThresholdConfig};
use crate::event::{Emoji, InboundMessage, MessageRef, ReactionEvent};
use crate::outbound::{Delivery, Gateway};

// ============================================================================
// Countdown
// ============================================================================

#[derive(Clone)]
pub struct ReactionCountdown {
    gateway: Gateway,
    config: Arc<CountdownReactionConfig>,
}

impl ReactionCountdown {
    pub fn new(gateway: Gateway, config: CountdownReactionConfig) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
        }
    }

    /// Number of glyph steps shown over the configured duration.
    pub fn steps(&self) -> u64 {
        self.config
            .duration_seconds
            .checked_div(self.config.interval_seconds)
            .unwrap_or(0)
    }

    /// Start a countdown on a human post in the countdown channel.
    pub fn on_message(&self, msg: &InboundMessage) -> bool {
        if !msg.author.kind.is_human()
            || self.config.channel != Some(msg.channel)
            || self.config.glyphs.is_empty()
        {
            return false;
        }

        let this = self.clone();
        let target = msg.reference();
        tokio::spawn(async move { this.run(target).await });
        true
    }

    async fn run(&self, target: MessageRef) {
        let interval = Duration::from_secs(self.config.interval_seconds);
        let mut last: Option<Emoji> = None;

        for step in 0..self.steps() {
            if let Some(previous) = last.take()
                && !matches!(
                    self.gateway.remove_reaction(target, &previous).await,
                    Ok(Delivery::Done)
                )
            {
                break;
            }

            let glyph = &self.config.glyphs[step as usize % self.config.glyphs.len()];
            let emoji = Emoji::unicode(glyph.as_str());
            if !matches!(
                self.gateway.add_reaction(target, &emoji).await,
                Ok(Delivery::Done)
            ) {
                break;
            }
            last = Some(emoji);

            tokio::time::sleep(interval).await;
        }

        debug!(target = %target, "Reaction countdown finished");
    }
}

// ============================================================================
// Threshold deletion
// ============================================================================

#[derive(Clone)]
pub struct ReactionThreshold {
    gateway: Gateway,
    config: Arc<ThresholdConfig>,
}

impl ReactionThreshold {
    pub fn new(gateway: Gateway, config: ThresholdConfig) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
        }
    }

    /// Whether `event` is a vote that pushes the target author's message
    /// over the threshold.
    pub fn matches(&self, event: &ReactionEvent) -> bool {
        let config = &self.config;
        let (Some(channel), Some(author), Some(emoji_id)) =
            (config.channel, config.target_author, config.emoji_id)
        else {
            return false;
        };

        event.reactor.kind.is_human()
            && event.message.channel == channel
            && event.message_author == Some(author)
            && event.emoji.custom_id() == Some(emoji_id)
            && event.count >= config.threshold
    }

    pub async fn on_reaction(&self, event: &ReactionEvent) -> bool {
        if !self.matches(event) {
            return false;
        }
        info!(target = %event.message, count = event.count, "Reaction threshold reached, deleting");
        let _ = self.gateway.delete(event.message).await;
        true
    }
}
