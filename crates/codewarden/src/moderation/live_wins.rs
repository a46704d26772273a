//! Today's win count, kept in one log message that is edited in place.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::{ConfigError, LiveWinsConfig};
use crate::event::{ChannelId, MessageRef};
use crate::outbound::{Delivery, Gateway};

#[derive(Clone)]
pub struct LiveWins {
    gateway: Gateway,
    channel: Option<ChannelId>,
    log_channel: Option<ChannelId>,
    interval: Duration,
    offset: FixedOffset,
    posted: Arc<Mutex<Option<MessageRef>>>,
}

impl LiveWins {
    pub fn new(gateway: Gateway, config: &LiveWinsConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            gateway,
            channel: config.channel,
            log_channel: config.log_channel,
            interval: config.interval(),
            offset: config.utc_offset()?,
            posted: Arc::new(Mutex::new(None)),
        })
    }

    fn is_enabled(&self) -> bool {
        self.channel.is_some() && self.log_channel.is_some() && !self.interval.is_zero()
    }

    /// Local midnight of the day containing `now`.
    fn day_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.with_timezone(&self.offset)
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_local_timezone(self.offset)
            .single()
            .map_or(now, |start| start.with_timezone(&Utc))
    }

    /// Recount today's human messages and show the total. The counter is
    /// edited in place and posted again if it vanished. Returns the total,
    /// or `None` if the rule is off or the history could not be read.
    pub async fn refresh(&self) -> Option<usize> {
        let (Some(channel), Some(log)) = (self.channel, self.log_channel) else {
            return None;
        };

        let mut posted = self.posted.lock().await;
        let since = self.day_start(Utc::now());
        let history = self.gateway.recent_messages(channel, since).await.ok()?;
        let total = history
            .iter()
            .filter(|m| m.author.kind.is_human() && m.created_at >= since)
            .count();
        let text = format!("🏆 **Live Wins Today:** `{total}`");

        if let Some(existing) = *posted {
            match self.gateway.edit(existing, &text).await {
                // Failed edits keep the handle for the next tick.
                Ok(Delivery::Done) | Err(_) => return Some(total),
                Ok(Delivery::Gone) => {
                    debug!(message = %existing, "Live counter vanished, posting a new one");
                    *posted = None;
                }
            }
        }
        if let Ok(sent) = self.gateway.send(log, &text).await {
            *posted = Some(sent);
        }
        Some(total)
    }

    /// Delete the counter message. Returns `true` if one was removed.
    pub async fn clear(&self) -> bool {
        let Some(existing) = self.posted.lock().await.take() else {
            return false;
        };
        matches!(self.gateway.delete(existing).await, Ok(Delivery::Done))
    }

    /// Refresh immediately and then every interval until aborted. Returns
    /// `None` when the rule is off.
    pub fn spawn(self) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }

        Some(tokio::spawn(async move {
            info!(every = ?self.interval, "Live wins counter started");
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Some(total) = self.refresh().await {
                    debug!(total, "Live wins refreshed");
                }
            }
        }))
    }
}
