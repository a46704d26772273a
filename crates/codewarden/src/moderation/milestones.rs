//! Per-user daily message milestones.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use dashmap::DashMap;
use tracing::debug;

use crate::config::MilestoneConfig;
use crate::event::{ChannelId, InboundMessage, MessageRef, UserId};
use crate::outbound::Gateway;

#[derive(Debug, Clone, Copy)]
struct DayCount {
    day: NaiveDate,
    count: u32,
}

#[derive(Clone)]
pub struct Milestones {
    gateway: Gateway,
    watched: Option<ChannelId>,
    announce: Option<ChannelId>,
    every: u32,
    offset: FixedOffset,
    counts: Arc<DashMap<UserId, DayCount>>,
    announcements: Arc<DashMap<UserId, MessageRef>>,
}

impl Milestones {
    pub fn new(gateway: Gateway, config: &MilestoneConfig, offset: FixedOffset) -> Self {
        Self {
            gateway,
            watched: config.channel,
            announce: config.announce_channel,
            every: config.every,
            offset,
            counts: Arc::new(DashMap::new()),
            announcements: Arc::new(DashMap::new()),
        }
    }

    /// Count `msg` toward its author's daily total; every `every`-th message
    /// replaces the author's previous announcement with a new one. Returns
    /// the milestone reached, if any.
    pub async fn on_message(&self, msg: &InboundMessage) -> Option<u32> {
        if !msg.author.kind.is_human() || self.watched != Some(msg.channel) || self.every == 0 {
            return None;
        }
        let announce = self.announce?;

        let day = msg.created_at.with_timezone(&self.offset).date_naive();
        let count = {
            let mut entry = self
                .counts
                .entry(msg.author.id)
                .or_insert(DayCount { day, count: 0 });
            if entry.day != day {
                *entry = DayCount { day, count: 0 };
            }
            entry.count += 1;
            entry.count
        };

        if count % self.every != 0 {
            return None;
        }

        debug!(user = %msg.author.id, count, "Milestone reached");
        if let Some((_, previous)) = self.announcements.remove(&msg.author.id) {
            let _ = self.gateway.delete(previous).await;
        }

        let text = format!("<@{}> **wins done today so far ({})**", msg.author.id, count);
        if let Ok(posted) = self.gateway.send(announce, &text).await {
            self.announcements.insert(msg.author.id, posted);
        }
        Some(count)
    }

    /// Today's count for `user`, in the configured offset.
    #[cfg(test)]
    fn count_for(&self, user: UserId, today: NaiveDate) -> u32 {
        self.counts
            .get(&user)
            .filter(|c| c.day == today)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}
